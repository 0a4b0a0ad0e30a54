//! Whole-archive compliance checking.
//!
//! Unlike the interactive pipeline, the checker never stops at the first
//! failure: it loads every source, validates every record, resolves every
//! reference, and returns one report with a diagnostic per finding. The same
//! entry point serves CI gates and the `cbar_check` binary.
//!
//! Rule codes:
//! - `CBAR001` source load or parse failure
//! - `CBAR002` duplicate record name across sources
//! - `CBAR010` schema error in a record field
//! - `CBAR011` advisory unused-variant-field warning
//! - `CBAR020` missing reference target
//! - `CBAR021` reference cycle
//! - `CBAR030` record name uses the reserved `_r` suffix
//! - `CBAR031` discrete norm and discretization count disagree

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult, Diagnostic};
use crate::loader::{MergePolicy, RecordLoader};
use crate::registry::BUILTIN_SOURCES;
use crate::resolver::resolve_archive;
use crate::validator::validate_record;

const LOAD: &str = "CBAR001";
const DUPLICATE: &str = "CBAR002";
const SCHEMA: &str = "CBAR010";
const MISSING_REFERENCE: &str = "CBAR020";
const CYCLE: &str = "CBAR021";
const RESERVED_SUFFIX: &str = "CBAR030";
const DISCRETE_MISMATCH: &str = "CBAR031";

/// Outcome of one archive check run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Number of records examined.
    pub checked: usize,
    /// Every finding, in record order (source-level findings first).
    pub findings: Vec<Diagnostic>,
}

impl CheckReport {
    /// Whether the archive is compliant. Warnings do not fail a check.
    pub fn passed(&self) -> bool {
        !self.findings.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.findings.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.findings.iter().filter(|d| d.is_warning()).count()
    }
}

impl std::fmt::Display for CheckReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "checked {} record(s): {} error(s), {} warning(s)",
            self.checked,
            self.error_count(),
            self.warning_count()
        )?;
        for finding in &self.findings {
            write!(f, "\n  {finding}")?;
        }
        Ok(())
    }
}

/// Collect-all checker over the built-in archive plus optional user
/// directories.
#[derive(Debug, Default)]
pub struct ArchiveChecker {
    include_builtin: bool,
    dirs: Vec<PathBuf>,
}

impl ArchiveChecker {
    /// Check the built-in archive.
    pub fn new() -> Self {
        Self {
            include_builtin: true,
            dirs: Vec::new(),
        }
    }

    /// Check user directories only.
    pub fn without_builtin() -> Self {
        Self::default()
    }

    /// Also check every YAML archive under `dir`.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    /// Run the full pipeline and collect every finding.
    pub fn run(&self) -> CheckReport {
        let mut loader = RecordLoader::new();
        if self.include_builtin {
            for (origin, text) in BUILTIN_SOURCES {
                loader.push_str(origin, text, MergePolicy::Strict);
            }
        }
        for dir in &self.dirs {
            loader.push_dir(dir, MergePolicy::Strict);
        }
        let (archive, load_errors) = loader.finish_collecting();

        let mut findings = Vec::new();
        for error in load_errors {
            findings.push(match error {
                ConfigError::Load { origin, detail } => {
                    Diagnostic::error(LOAD, origin, detail)
                }
                ConfigError::Duplicate {
                    name,
                    first,
                    second,
                } => Diagnostic::error(
                    DUPLICATE,
                    name,
                    format!("declared in both '{first}' and '{second}'"),
                )
                .with_hint("rename one record or load with override enabled"),
                other => Diagnostic::error(LOAD, "", other.to_string()),
            });
        }

        let order: Vec<String> = archive.names().map(String::from).collect();
        let mut defs = HashMap::new();
        for name in &order {
            if name.ends_with("_r") {
                findings.push(
                    Diagnostic::error(
                        RESERVED_SUFFIX,
                        name.clone(),
                        "record names ending in '_r' are reserved for reversed palettes",
                    )
                    .with_hint("pick a name without the '_r' suffix"),
                );
            }
            let raw = match archive.get(name) {
                Some(raw) => raw,
                None => continue,
            };
            let result = match validate_record(name, raw) {
                Ok(validation) => {
                    for warning in validation.warnings {
                        findings.push(warning.prefixed(name));
                    }
                    Ok(validation.def)
                }
                Err(e) => {
                    if let ConfigError::Schema { issues, .. } = &e {
                        for issue in issues {
                            findings.push(issue.clone().prefixed(name));
                        }
                    }
                    Err(e)
                }
            };
            defs.insert(name.clone(), result);
        }

        let resolved = resolve_archive(&order, &defs);
        let mut seen_cycles: HashSet<BTreeSet<String>> = HashSet::new();
        for (name, result) in resolved.iter() {
            match result {
                Ok(config) => {
                    // Discrete norms imply an exact color count; a declared
                    // discretization must agree with it.
                    if let (Some(total), Some(implied)) =
                        (config.cmap.total_n(), config.norm.implied_ncolors())
                    {
                        if total != implied {
                            findings.push(
                                Diagnostic::error(
                                    DISCRETE_MISMATCH,
                                    format!("{name}.cmap.n"),
                                    format!(
                                        "discretization count {total} does not match the \
                                         {implied} color(s) the norm implies"
                                    ),
                                )
                                .with_hint(format!("set n so the total is {implied}")),
                            );
                        }
                    }
                }
                Err(ConfigError::Cycle { cycle }) => {
                    // Each member memoizes the same cycle; report it once.
                    let members: BTreeSet<String> = cycle.iter().cloned().collect();
                    if seen_cycles.insert(members) {
                        findings.push(Diagnostic::error(
                            CYCLE,
                            name.to_string(),
                            format!("reference cycle: {}", cycle.join(" -> ")),
                        ));
                    }
                }
                Err(ConfigError::Reference { target, detail, .. }) => {
                    // A reference into a record that exists but is itself
                    // broken is consequential; the target's own findings
                    // already cover it.
                    if !archive.contains(target) {
                        findings.push(
                            Diagnostic::error(
                                MISSING_REFERENCE,
                                format!("{name}.reference"),
                                format!("target '{target}': {detail}"),
                            )
                            .with_hint("reference an existing record name"),
                        );
                    } else {
                        debug!(record = name, target, "skipping consequential reference failure");
                    }
                }
                // Schema errors were reported per field above.
                Err(_) => {}
            }
        }

        let report = CheckReport {
            checked: archive.len(),
            findings,
        };
        info!(
            checked = report.checked,
            errors = report.error_count(),
            warnings = report.warning_count(),
            "archive check finished"
        );
        report
    }
}

/// Compliance gate over the built-in archive: `Ok` with the (possibly
/// warning-carrying) report when compliant, `Err` wrapping the report
/// otherwise.
pub fn check_archive() -> ConfigResult<CheckReport> {
    let report = ArchiveChecker::new().run();
    if report.passed() {
        Ok(report)
    } else {
        Err(ConfigError::Check(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn check_dir(yaml: &str) -> CheckReport {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("archive.yaml"), yaml).unwrap();
        ArchiveChecker::without_builtin().with_dir(temp.path()).run()
    }

    fn codes(report: &CheckReport) -> Vec<&str> {
        report.findings.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn test_builtin_archive_is_clean() {
        let report = check_archive().unwrap();
        assert!(report.passed());
        assert_eq!(report.error_count(), 0);
        assert!(report.checked > 0);
    }

    #[test]
    fn test_clean_user_archive() {
        let report = check_dir(
            "ok: {cmap: {name: viridis}, norm: {name: Norm, vmin: 0.0, vmax: 1.0}}\n",
        );
        assert!(report.passed());
        assert_eq!(report.checked, 1);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_parse_failure_is_cbar001() {
        let report = check_dir("ok: {cmap: [unclosed\n");
        assert!(!report.passed());
        assert_eq!(codes(&report), vec!["CBAR001"]);
    }

    #[test]
    fn test_duplicate_across_sources_is_cbar002() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.yaml"), "x: {cmap: {name: gray}}\n").unwrap();
        std::fs::write(temp.path().join("b.yaml"), "x: {cmap: {name: magma}}\n").unwrap();
        let report = ArchiveChecker::without_builtin().with_dir(temp.path()).run();
        assert_eq!(codes(&report), vec!["CBAR002"]);
        assert_eq!(report.findings[0].path, "x");
    }

    #[test]
    fn test_schema_findings_are_per_field_and_prefixed() {
        let report = check_dir(
            "bad: {cmap: {name: gray, bad_alpha: 7.0}, norm: {name: SymLogNorm}}\n",
        );
        assert!(!report.passed());
        assert!(codes(&report).iter().all(|c| *c == "CBAR010"));
        assert!(report.findings.len() >= 2);
        assert!(report
            .findings
            .iter()
            .any(|d| d.path == "bad.cmap.bad_alpha"));
        assert!(report
            .findings
            .iter()
            .any(|d| d.path == "bad.norm.linthresh"));
    }

    #[test]
    fn test_unused_field_warning_does_not_fail() {
        let report = check_dir(
            "warm: {norm: {name: Norm, vmin: 0.0, vmax: 1.0, gamma: 2.0}}\n",
        );
        assert!(report.passed());
        assert_eq!(codes(&report), vec!["CBAR011"]);
        assert_eq!(report.findings[0].path, "warm.norm.gamma");
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_missing_reference_is_cbar020() {
        let report = check_dir("a: {reference: ghost}\n");
        assert_eq!(codes(&report), vec!["CBAR020"]);
        assert_eq!(report.findings[0].path, "a.reference");
    }

    #[test]
    fn test_cycle_reported_once_with_full_path() {
        let report = check_dir("a: {reference: b}\nb: {reference: c}\nc: {reference: a}\n");
        assert_eq!(codes(&report), vec!["CBAR021"]);
        let msg = &report.findings[0].message;
        for name in ["a", "b", "c"] {
            assert!(msg.contains(name), "cycle message should name '{name}': {msg}");
        }
    }

    #[test]
    fn test_two_independent_cycles_are_two_findings() {
        let report = check_dir(
            "a: {reference: b}\nb: {reference: a}\nc: {reference: d}\nd: {reference: c}\n",
        );
        assert_eq!(codes(&report), vec!["CBAR021", "CBAR021"]);
    }

    #[test]
    fn test_reference_into_broken_record_is_not_double_counted() {
        let report = check_dir(
            "bad: {norm: {name: BoundaryNorm, boundaries: [3.0, 1.0]}}\nalias: {reference: bad}\n",
        );
        // only the target's own schema finding
        assert!(codes(&report).iter().all(|c| *c == "CBAR010"));
    }

    #[test]
    fn test_reserved_suffix_is_cbar030() {
        let report = check_dir("rain_r: {cmap: {name: gray}}\n");
        assert_eq!(codes(&report), vec!["CBAR030"]);
    }

    #[test]
    fn test_boundary_norm_count_mismatch_is_cbar031() {
        let report = check_dir(
            "p: {cmap: {name: gray, n: 5}, norm: {name: BoundaryNorm, boundaries: [0.0, 1.0, 2.0], extend: max}}\n",
        );
        // 2 bins + 1 extension side = 3 implied, n says 5
        assert_eq!(codes(&report), vec!["CBAR031"]);
        assert_eq!(report.findings[0].path, "p.cmap.n");
    }

    #[test]
    fn test_category_norm_count_match_passes() {
        let report = check_dir(
            "c: {cmap: {name: tab10, n: 3}, norm: {name: CategoryNorm, categories: {0: A, 1: B, 2: C}}}\n",
        );
        assert!(report.passed(), "unexpected findings: {report}");
    }

    #[test]
    fn test_report_display() {
        let report = check_dir("rain_r: {cmap: {name: gray}}\n");
        let rendered = report.to_string();
        assert!(rendered.starts_with("checked 1 record(s): 1 error(s), 0 warning(s)"));
        assert!(rendered.contains("CBAR030"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = check_dir("a: {reference: ghost}\n");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"CBAR020\""));
        assert!(json.contains("\"checked\":1"));
    }
}
