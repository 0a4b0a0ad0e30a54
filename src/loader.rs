//! Record loader: declarative YAML sources into an insertion-ordered raw
//! archive.
//!
//! Sources are pushed one at a time (embedded strings, files, directories,
//! inline records), each under an explicit [`MergePolicy`]. Two drains exist:
//! [`RecordLoader::finish`] fails on the first accumulated error (the
//! interactive path), [`RecordLoader::finish_collecting`] returns the archive
//! together with every error (the archive checker path).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};

/// A raw, untyped record as parsed from a source.
pub type RawRecord = Value;

/// How duplicate record names across sources are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Duplicate names are an error naming both sources.
    #[default]
    Strict,
    /// Later sources replace earlier ones (logged, never silent).
    Override,
}

/// Insertion-ordered collection of raw records with source attribution.
#[derive(Debug, Clone, Default)]
pub struct RawArchive {
    order: Vec<String>,
    records: HashMap<String, RawRecord>,
    sources: HashMap<String, String>,
}

impl RawArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&RawRecord> {
        self.records.get(name)
    }

    /// Source the record was loaded from (file path or `<inline>`).
    pub fn source_of(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }

    /// Record names in first-registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Admit one record. Under [`MergePolicy::Override`] a replaced record
    /// keeps its original order slot.
    pub fn insert(
        &mut self,
        name: &str,
        record: RawRecord,
        origin: &str,
        policy: MergePolicy,
    ) -> ConfigResult<()> {
        if self.records.contains_key(name) {
            match policy {
                MergePolicy::Strict => {
                    return Err(ConfigError::Duplicate {
                        name: name.to_string(),
                        first: self
                            .sources
                            .get(name)
                            .cloned()
                            .unwrap_or_else(|| "<unknown>".to_string()),
                        second: origin.to_string(),
                    });
                }
                MergePolicy::Override => {
                    debug!(record = name, origin, "overriding earlier record");
                }
            }
        } else {
            self.order.push(name.to_string());
        }
        self.records.insert(name.to_string(), record);
        self.sources.insert(name.to_string(), origin.to_string());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        if self.records.remove(name).is_some() {
            self.sources.remove(name);
            self.order.retain(|n| n != name);
            true
        } else {
            false
        }
    }
}

/// Accumulates declarative sources into a [`RawArchive`].
#[derive(Debug, Default)]
pub struct RecordLoader {
    archive: RawArchive,
    errors: Vec<ConfigError>,
}

impl RecordLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one YAML document: a mapping of record name to record body.
    pub fn push_str(&mut self, origin: &str, text: &str, policy: MergePolicy) {
        let doc: Value = match serde_yaml::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                let detail = match e.location() {
                    Some(loc) => {
                        format!("{} (line {}, column {})", e, loc.line(), loc.column())
                    }
                    None => e.to_string(),
                };
                self.errors.push(ConfigError::load(origin, detail));
                return;
            }
        };
        // An empty file parses as null; treat it as an empty mapping.
        if doc.is_null() {
            debug!(origin, "source is empty, skipping");
            return;
        }
        let map = match doc.as_mapping() {
            Some(m) => m,
            None => {
                self.errors.push(ConfigError::load(
                    origin,
                    "top level must be a mapping of record name to record",
                ));
                return;
            }
        };
        for (key, record) in map {
            let name = match key.as_str() {
                Some(s) => s,
                None => {
                    self.errors.push(ConfigError::load(
                        origin,
                        format!("record names must be strings, got {key:?}"),
                    ));
                    continue;
                }
            };
            if let Err(e) = self.archive.insert(name, record.clone(), origin, policy) {
                self.errors.push(e);
            }
        }
    }

    /// Load a single YAML file.
    pub fn push_file(&mut self, path: &Path, policy: MergePolicy) {
        let origin = path.display().to_string();
        match fs::read_to_string(path) {
            Ok(text) => self.push_str(&origin, &text, policy),
            Err(e) => self.errors.push(ConfigError::load(origin, e.to_string())),
        }
    }

    /// Load every `*.yaml`/`*.yml` under a directory, recursively, in sorted
    /// path order for determinism.
    pub fn push_dir(&mut self, dir: &Path, policy: MergePolicy) {
        if !dir.exists() {
            warn!(dir = %dir.display(), "colorbar archive directory does not exist");
            return;
        }
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.errors
                    .push(ConfigError::load(dir.display().to_string(), e.to_string()));
                return;
            }
        };
        let mut paths: Vec<_> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();
        for path in paths {
            if path.is_dir() {
                self.push_dir(&path, policy);
            } else if path
                .extension()
                .map(|e| e == "yaml" || e == "yml")
                .unwrap_or(false)
            {
                self.push_file(&path, policy);
            }
        }
    }

    /// Admit one inline record.
    pub fn push_record(&mut self, name: &str, record: RawRecord, policy: MergePolicy) {
        if let Err(e) = self.archive.insert(name, record, "<inline>", policy) {
            self.errors.push(e);
        }
    }

    /// Fail-fast drain: the archive, or the first accumulated error.
    pub fn finish(mut self) -> ConfigResult<RawArchive> {
        if self.errors.is_empty() {
            Ok(self.archive)
        } else {
            Err(self.errors.remove(0))
        }
    }

    /// Collect-all drain: the archive plus every accumulated error.
    pub fn finish_collecting(self) -> (RawArchive, Vec<ConfigError>) {
        (self.archive, self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_yaml(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_push_str_orders_records() {
        let mut loader = RecordLoader::new();
        loader.push_str(
            "<test>",
            "zulu: {cmap: {name: viridis}}\nalpha: {cmap: {name: gray}}\n",
            MergePolicy::Strict,
        );
        let archive = loader.finish().unwrap();
        let names: Vec<_> = archive.names().collect();
        assert_eq!(names, vec!["zulu", "alpha"]);
        assert_eq!(archive.source_of("zulu"), Some("<test>"));
    }

    #[test]
    fn test_duplicate_strict_is_error() {
        let mut loader = RecordLoader::new();
        loader.push_str("a.yaml", "x: {cmap: {name: viridis}}", MergePolicy::Strict);
        loader.push_str("b.yaml", "x: {cmap: {name: gray}}", MergePolicy::Strict);
        let err = loader.finish().unwrap_err();
        match err {
            ConfigError::Duplicate { name, first, second } => {
                assert_eq!(name, "x");
                assert_eq!(first, "a.yaml");
                assert_eq!(second, "b.yaml");
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_override_replaces_in_place() {
        let mut loader = RecordLoader::new();
        loader.push_str(
            "a.yaml",
            "x: {cmap: {name: viridis}}\ny: {cmap: {name: gray}}",
            MergePolicy::Strict,
        );
        loader.push_str("b.yaml", "x: {cmap: {name: magma}}", MergePolicy::Override);
        let archive = loader.finish().unwrap();
        // order slot preserved
        let names: Vec<_> = archive.names().collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(archive.source_of("x"), Some("b.yaml"));
        let cmap_name = &archive.get("x").unwrap()["cmap"]["name"];
        assert_eq!(cmap_name.as_str(), Some("magma"));
    }

    #[test]
    fn test_malformed_yaml_names_source() {
        let mut loader = RecordLoader::new();
        loader.push_str("bad.yaml", "x: {cmap: [unclosed", MergePolicy::Strict);
        let err = loader.finish().unwrap_err();
        match err {
            ConfigError::Load { origin, .. } => assert_eq!(origin, "bad.yaml"),
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_mapping_top_level() {
        let mut loader = RecordLoader::new();
        loader.push_str("list.yaml", "- a\n- b\n", MergePolicy::Strict);
        assert!(matches!(
            loader.finish(),
            Err(ConfigError::Load { .. })
        ));
    }

    #[test]
    fn test_push_dir_sorted_and_recursive() {
        let temp = TempDir::new().unwrap();
        write_yaml(temp.path(), "b.yaml", "beta: {cmap: {name: gray}}");
        write_yaml(temp.path(), "a.yaml", "alpha: {cmap: {name: viridis}}");
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        write_yaml(
            &temp.path().join("sub"),
            "c.yml",
            "gamma: {cmap: {name: magma}}",
        );

        let mut loader = RecordLoader::new();
        loader.push_dir(temp.path(), MergePolicy::Strict);
        let archive = loader.finish().unwrap();
        let names: Vec<_> = archive.names().collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_finish_collecting_keeps_all_errors() {
        let mut loader = RecordLoader::new();
        loader.push_str("bad1.yaml", "[", MergePolicy::Strict);
        loader.push_str("ok.yaml", "x: {cmap: {name: gray}}", MergePolicy::Strict);
        loader.push_str("bad2.yaml", "x: {}", MergePolicy::Strict);
        let (archive, errors) = loader.finish_collecting();
        assert_eq!(archive.len(), 1);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_empty_source_is_no_records() {
        let mut loader = RecordLoader::new();
        loader.push_str("empty.yaml", "", MergePolicy::Strict);
        let archive = loader.finish().unwrap();
        assert!(archive.is_empty());
    }
}
