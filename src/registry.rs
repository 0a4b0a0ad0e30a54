//! Process-wide colorbar registry.
//!
//! The registry keeps the raw archive (built-in plus registered records) and
//! a lazily built resolved view. The first query runs the full
//! loader -> validator -> resolver pipeline and caches the result;
//! `register`/`unregister`/`reset` invalidate the cache so the next query
//! re-resolves. Consumers normally construct their own instances; the
//! [`registry`] handle exists for callers that want the shared one.

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::{MergePolicy, RawArchive, RawRecord, RecordLoader};
use crate::resolver::{resolve_archive, ResolvedArchive};
use crate::settings::ColorbarConfig;
use crate::validator::validate_record;

/// The YAML archive shipped with the crate.
pub(crate) const BUILTIN_SOURCES: &[(&str, &str)] = &[
    (
        "builtin:colorbars/atmosphere.yaml",
        include_str!("../config/colorbars/atmosphere.yaml"),
    ),
    (
        "builtin:colorbars/precipitation.yaml",
        include_str!("../config/colorbars/precipitation.yaml"),
    ),
    (
        "builtin:colorbars/temperature.yaml",
        include_str!("../config/colorbars/temperature.yaml"),
    ),
];

fn builtin_archive() -> RawArchive {
    let mut loader = RecordLoader::new();
    for (origin, text) in BUILTIN_SOURCES {
        loader.push_str(origin, text, MergePolicy::Strict);
    }
    // The embedded archive is guarded by `check_archive` tests; a parse
    // failure here is a packaging bug, not a runtime condition.
    loader.finish().expect("embedded colorbar archive is well-formed")
}

/// Store of colorbar records keyed by name, with a lazily built resolved
/// cache.
#[derive(Debug, Default)]
pub struct ColorbarRegistry {
    raw: RawArchive,
    resolved: Option<ResolvedArchive>,
}

impl ColorbarRegistry {
    /// An empty registry (mostly for tests).
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in archive.
    pub fn with_builtin() -> Self {
        Self {
            raw: builtin_archive(),
            resolved: None,
        }
    }

    fn invalidate(&mut self) {
        self.resolved = None;
    }

    fn ensure_resolved(&mut self) -> &ResolvedArchive {
        if self.resolved.is_none() {
            let order: Vec<String> = self.raw.names().map(String::from).collect();
            let defs = order
                .iter()
                .filter_map(|name| self.raw.get(name).map(|raw| (name, raw)))
                .map(|(name, raw)| {
                    let res = validate_record(name, raw).map(|v| v.def);
                    (name.clone(), res)
                })
                .collect();
            debug!(records = order.len(), "building resolved colorbar view");
            self.resolved = Some(resolve_archive(&order, &defs));
        }
        self.resolved
            .as_ref()
            .expect("resolved view just built")
    }

    /// Look up a resolved record. A record that failed validation or
    /// resolution returns its own error; an unknown name is `NotFound`.
    pub fn get(&mut self, name: &str) -> ConfigResult<ColorbarConfig> {
        match self.ensure_resolved().get(name) {
            Some(res) => res.clone(),
            None => Err(ConfigError::NotFound(name.to_string())),
        }
    }

    /// Record names in first-registration order, optionally filtered by
    /// auxiliary category tag. Only resolvable records can match a filter.
    pub fn available(&mut self, category: Option<&str>) -> Vec<String> {
        let resolved = self.ensure_resolved();
        match category {
            None => resolved.names().map(String::from).collect(),
            Some(tag) => resolved
                .iter()
                .filter_map(|(name, res)| match res {
                    Ok(config) if config.auxiliary.has_category(tag) => Some(name.to_string()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Admit one raw record. Without `overwrite`, a duplicate name is an
    /// error.
    pub fn register(&mut self, name: &str, record: RawRecord, overwrite: bool) -> ConfigResult<()> {
        let policy = if overwrite {
            MergePolicy::Override
        } else {
            MergePolicy::Strict
        };
        self.raw.insert(name, record, "<registered>", policy)?;
        self.invalidate();
        Ok(())
    }

    /// Load a YAML file or directory of records into the registry.
    pub fn register_path(&mut self, path: &Path, overwrite: bool) -> ConfigResult<()> {
        let mut loader = RecordLoader::new();
        if path.is_dir() {
            loader.push_dir(path, MergePolicy::Strict);
        } else {
            loader.push_file(path, MergePolicy::Strict);
        }
        let incoming = loader.finish()?;
        let policy = if overwrite {
            MergePolicy::Override
        } else {
            MergePolicy::Strict
        };
        for name in incoming.names().map(String::from).collect::<Vec<_>>() {
            let record = incoming
                .get(&name)
                .cloned()
                .expect("record listed in its own archive");
            let origin = incoming.source_of(&name).unwrap_or("<registered>").to_string();
            self.raw.insert(&name, record, &origin, policy)?;
        }
        self.invalidate();
        Ok(())
    }

    /// Remove one record. Returns whether it existed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let removed = self.raw.remove(name);
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Drop every registered record and return to the built-in archive.
    pub fn reset(&mut self) {
        self.raw = builtin_archive();
        self.invalidate();
    }

    /// Fail-fast whole-archive check: the first record error, in
    /// registration order. Used at registration review time; the archive
    /// checker is the collect-all counterpart.
    pub fn validate(&mut self) -> ConfigResult<()> {
        let resolved = self.ensure_resolved();
        let first_err = resolved
            .iter()
            .find_map(|(_, res)| res.as_ref().err().cloned());
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

static REGISTRY: OnceLock<Mutex<ColorbarRegistry>> = OnceLock::new();

/// The shared process-wide registry, initialized with the built-in archive
/// on first access. The mutex serializes `register`/`reset` against the
/// lazy rebuild; readers of the cached view take the same short lock.
pub fn registry() -> &'static Mutex<ColorbarRegistry> {
    REGISTRY.get_or_init(|| Mutex::new(ColorbarRegistry::with_builtin()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::NormSettings;
    use pretty_assertions::assert_eq;

    fn record(yaml: &str) -> RawRecord {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_builtin_archive_loads() {
        let mut reg = ColorbarRegistry::with_builtin();
        assert!(!reg.is_empty());
        let config = reg.get("precip_rate").unwrap();
        assert!(matches!(config.norm, NormSettings::BoundaryNorm { .. }));
    }

    #[test]
    fn test_builtin_reference_resolves() {
        let mut reg = ColorbarRegistry::with_builtin();
        let alias = reg.get("rain_rate").unwrap();
        let target = reg.get("precip_rate").unwrap();
        assert_eq!(alias.cmap, target.cmap);
        assert_eq!(alias.norm, target.norm);
        assert_eq!(alias.cbar, target.cbar);
        assert_ne!(alias.auxiliary, target.auxiliary);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let mut reg = ColorbarRegistry::with_builtin();
        assert!(matches!(
            reg.get("no_such_bar"),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_register_invalidates_cache() {
        let mut reg = ColorbarRegistry::with_builtin();
        assert!(matches!(reg.get("custom"), Err(ConfigError::NotFound(_))));
        reg.register(
            "custom",
            record("cmap: {name: gray, n: 4}\nnorm: {name: Norm, vmin: 0.0, vmax: 4.0}"),
            false,
        )
        .unwrap();
        let config = reg.get("custom").unwrap();
        assert_eq!(config.cmap.n, Some(vec![4]));
    }

    #[test]
    fn test_register_duplicate_needs_overwrite() {
        let mut reg = ColorbarRegistry::with_builtin();
        let rec = record("cmap: {name: gray}");
        assert!(reg.register("precip_rate", rec.clone(), false).is_err());
        reg.register("precip_rate", rec, true).unwrap();
        let config = reg.get("precip_rate").unwrap();
        assert_eq!(config.cmap.name, vec!["gray"]);
    }

    #[test]
    fn test_reset_restores_builtin_only() {
        let mut reg = ColorbarRegistry::with_builtin();
        let before = reg.available(None);
        reg.register("custom", record("cmap: {name: gray}"), false)
            .unwrap();
        reg.register("precip_rate", record("cmap: {name: gray}"), true)
            .unwrap();
        reg.reset();
        assert_eq!(reg.available(None), before);
        assert!(matches!(
            reg.get("precip_rate").unwrap().norm,
            NormSettings::BoundaryNorm { .. }
        ));
    }

    #[test]
    fn test_available_preserves_insertion_order_and_filters() {
        let mut reg = ColorbarRegistry::new();
        reg.register("zulu", record("cmap: {name: gray}\nauxiliary: {category: a}"), false)
            .unwrap();
        reg.register("alpha", record("cmap: {name: gray}\nauxiliary: {category: b}"), false)
            .unwrap();
        assert_eq!(reg.available(None), vec!["zulu", "alpha"]);
        assert_eq!(reg.available(Some("A")), vec!["zulu"]);
        assert!(reg.available(Some("c")).is_empty());
    }

    #[test]
    fn test_invalid_record_returns_its_own_error() {
        let mut reg = ColorbarRegistry::new();
        reg.register("bad", record("norm: {name: BoundaryNorm, boundaries: [2, 1]}"), false)
            .unwrap();
        assert!(matches!(reg.get("bad"), Err(ConfigError::Schema { .. })));
        // repeated lookups keep returning the cached failure
        assert!(matches!(reg.get("bad"), Err(ConfigError::Schema { .. })));
    }

    #[test]
    fn test_register_path_from_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("user.yaml"),
            "user_bar:\n  cmap: {name: viridis}\n  auxiliary: {category: user}\n",
        )
        .unwrap();
        let mut reg = ColorbarRegistry::with_builtin();
        reg.register_path(temp.path(), false).unwrap();
        assert!(reg.get("user_bar").is_ok());
        assert_eq!(reg.available(Some("user")), vec!["user_bar"]);
    }

    #[test]
    fn test_validate_fail_fast() {
        let mut reg = ColorbarRegistry::with_builtin();
        assert!(reg.validate().is_ok());
        reg.register("bad", record("norm: {name: NopeNorm}"), false)
            .unwrap();
        assert!(matches!(reg.validate(), Err(ConfigError::Schema { .. })));
    }

    #[test]
    fn test_global_handle() {
        let reg = registry();
        let mut guard = reg.lock().unwrap();
        assert!(guard.get("cloud_phase").is_ok());
    }
}
