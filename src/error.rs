//! Error taxonomy and diagnostics for the colorbar configuration pipeline.
//!
//! Interactive callers (registry lookups, single-record validation) receive a
//! `ConfigError` as soon as one record fails. The archive checker instead
//! collects `Diagnostic`s across every record and returns them in one report.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checker::CheckReport;

/// Result alias used throughout the crate.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Error type covering every stage of the pipeline.
///
/// All variants are `Clone` so the registry can cache a record's failure and
/// hand it back on each subsequent lookup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A declarative source could not be read or parsed.
    #[error("failed to load '{origin}': {detail}")]
    Load { origin: String, detail: String },

    /// The same record name was declared twice under a strict merge policy.
    #[error("duplicate record '{name}': declared in '{first}' and '{second}'")]
    Duplicate {
        name: String,
        first: String,
        second: String,
    },

    /// A record failed schema validation. One diagnostic per field issue.
    #[error("record '{record}' failed validation with {} issue(s)", issues.len())]
    Schema {
        record: String,
        issues: Vec<Diagnostic>,
    },

    /// A record references a target that is missing or itself unusable.
    #[error("record '{record}' cannot resolve reference to '{target}': {detail}")]
    Reference {
        record: String,
        target: String,
        detail: String,
    },

    /// The reference chain loops back on itself.
    #[error("reference cycle: {}", cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },

    /// The schema was valid but an externally-defined name (palette, named
    /// color) could not be resolved.
    #[error("cannot build {what} '{name}': {detail}")]
    Build {
        what: String,
        name: String,
        detail: String,
    },

    /// Registry lookup miss.
    #[error("no colorbar named '{0}' is registered")]
    NotFound(String),

    /// Aggregated archive compliance failure.
    #[error("archive check failed: {0}")]
    Check(CheckReport),
}

impl ConfigError {
    /// Convenience constructor for load failures.
    pub fn load(origin: impl Into<String>, detail: impl Into<String>) -> Self {
        ConfigError::Load {
            origin: origin.into(),
            detail: detail.into(),
        }
    }

    /// Convenience constructor for builder failures.
    pub fn build(
        what: impl Into<String>,
        name: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        ConfigError::Build {
            what: what.into(),
            name: name.into(),
            detail: detail.into(),
        }
    }
}

/// How serious a finding is. Only `Error` fails a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    /// Advisory; the record stays usable.
    Warn,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One validation or compliance finding, addressed by a field path.
///
/// Paths use dotted/indexed notation inside a record (`norm.boundaries[2]`,
/// `cmap.n[1]`); the archive checker prepends the record name so findings
/// from different records stay distinguishable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule code, `CBAR0xx`.
    pub code: String,
    pub severity: Severity,
    /// Where in the record the finding applies.
    pub path: String,
    pub message: String,
    /// Suggested fix, when one is obvious.
    pub hint: Option<String>,
}

impl Diagnostic {
    /// A finding that fails the record.
    pub fn error(
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            severity: Severity::Error,
            path: path.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// An advisory finding; the record stays usable.
    pub fn warn(
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            severity: Severity::Warn,
            path: path.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a suggested fix.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Return a copy with the record name prefixed onto the field path.
    pub fn prefixed(mut self, record: &str) -> Self {
        self.path = if self.path.is_empty() {
            record.to_string()
        } else {
            format!("{}.{}", record, self.path)
        };
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warn
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} at {}: {}",
            self.code, self.severity, self.path, self.message
        )?;
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {})", hint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_creation() {
        let d = Diagnostic::error("CBAR010", "norm.boundaries[2]", "not strictly increasing");
        assert_eq!(d.code, "CBAR010");
        assert_eq!(d.severity, Severity::Error);
        assert!(d.is_error());
        assert!(!d.is_warning());
    }

    #[test]
    fn test_diagnostic_prefixed() {
        let d = Diagnostic::warn("CBAR011", "norm.linthresh", "ignored").prefixed("precip_rate");
        assert_eq!(d.path, "precip_rate.norm.linthresh");

        let top = Diagnostic::error("CBAR010", "", "record must be a mapping").prefixed("x");
        assert_eq!(top.path, "x");
    }

    #[test]
    fn test_cycle_display() {
        let e = ConfigError::Cycle {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(e.to_string(), "reference cycle: a -> b -> a");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
    }
}
