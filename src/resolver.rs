//! Reference resolution: eliminate aliasing between validated records.
//!
//! Depth-first walk with an explicit visiting stack per top-level call.
//! Resolution is memoized, so every record is resolved at most once no
//! matter how many records reference it, and cycles are detected instead of
//! looping.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::settings::{ColorbarConfig, ColorbarDef};

/// The resolved archive: every record either a self-contained
/// [`ColorbarConfig`] or the error that made it unusable, in first
/// registration order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedArchive {
    order: Vec<String>,
    records: HashMap<String, ConfigResult<ColorbarConfig>>,
}

impl ResolvedArchive {
    pub fn get(&self, name: &str) -> Option<&ConfigResult<ColorbarConfig>> {
        self.records.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigResult<ColorbarConfig>)> {
        self.order.iter().filter_map(|name| {
            self.records
                .get(name)
                .map(|res| (name.as_str(), res))
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Resolve every record of an archive.
///
/// `defs` holds the per-record validation outcome; records that failed
/// validation keep their own error and poison any record referencing them.
pub fn resolve_archive(
    order: &[String],
    defs: &HashMap<String, ConfigResult<ColorbarDef>>,
) -> ResolvedArchive {
    let mut done: HashMap<String, ConfigResult<ColorbarConfig>> = HashMap::new();
    for name in order {
        let mut visiting = Vec::new();
        let _ = resolve_one(name, defs, &mut done, &mut visiting);
    }
    debug!(records = order.len(), "resolved colorbar archive");
    ResolvedArchive {
        order: order.to_vec(),
        records: done,
    }
}

fn resolve_one(
    name: &str,
    defs: &HashMap<String, ConfigResult<ColorbarDef>>,
    done: &mut HashMap<String, ConfigResult<ColorbarConfig>>,
    visiting: &mut Vec<String>,
) -> ConfigResult<ColorbarConfig> {
    if let Some(res) = done.get(name) {
        return res.clone();
    }
    if let Some(pos) = visiting.iter().position(|n| n == name) {
        let mut cycle: Vec<String> = visiting[pos..].to_vec();
        cycle.push(name.to_string());
        return Err(ConfigError::Cycle { cycle });
    }

    let def = match defs.get(name) {
        Some(Ok(def)) => def,
        Some(Err(e)) => {
            done.insert(name.to_string(), Err(e.clone()));
            return Err(e.clone());
        }
        None => {
            // Only reachable through a dangling reference; top-level names
            // always come from the archive itself.
            let referrer = visiting.last().cloned().unwrap_or_default();
            return Err(ConfigError::Reference {
                record: referrer,
                target: name.to_string(),
                detail: "no such record".to_string(),
            });
        }
    };

    let result = match &def.reference {
        None => Ok(ColorbarConfig {
            name: name.to_string(),
            cmap: def.cmap.clone().unwrap_or_default(),
            norm: def.norm.clone().unwrap_or_default(),
            cbar: def.cbar.clone().unwrap_or_default(),
            auxiliary: def.auxiliary.clone(),
        }),
        Some(target) => {
            visiting.push(name.to_string());
            let target_res = resolve_one(target, defs, done, visiting);
            visiting.pop();
            match target_res {
                // A full structural copy of the target's settings; the
                // referencing record keeps its own auxiliary metadata.
                Ok(resolved) => Ok(ColorbarConfig {
                    name: name.to_string(),
                    cmap: resolved.cmap,
                    norm: resolved.norm,
                    cbar: resolved.cbar,
                    auxiliary: def.auxiliary.clone(),
                }),
                Err(e) => {
                    let err = match &e {
                        // Keep cycle errors intact for every member of the
                        // cycle so each reports the full path.
                        ConfigError::Cycle { cycle } if cycle.iter().any(|n| n == name) => e,
                        ConfigError::Reference { record, .. } if record == name => e,
                        other => ConfigError::Reference {
                            record: name.to_string(),
                            target: target.clone(),
                            detail: format!("target is unusable: {other}"),
                        },
                    };
                    Err(err)
                }
            }
        }
    };

    done.insert(name.to_string(), result.clone());
    result
}
