//! Typed colorbar settings: the validator's output and the resolver's input.
//!
//! A raw record splits into four sub-blocks (`cmap`, `norm`, `cbar`,
//! `auxiliary`) plus an optional `reference` to another record. `ColorbarDef`
//! is the per-record shape before reference resolution; `ColorbarConfig` is
//! the self-contained shape the registry retains.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::color::ColorValue;

/// Colorbar extension behavior for out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extend {
    #[default]
    Neither,
    Min,
    Max,
    Both,
}

impl Extend {
    pub const LITERALS: [&'static str; 4] = ["neither", "min", "max", "both"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "neither" => Some(Extend::Neither),
            "min" => Some(Extend::Min),
            "max" => Some(Extend::Max),
            "both" => Some(Extend::Both),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Extend::Neither => "neither",
            Extend::Min => "min",
            Extend::Max => "max",
            Extend::Both => "both",
        }
    }

    /// Number of extension sides active (each needs one extra color).
    pub fn extra_sides(&self) -> usize {
        match self {
            Extend::Neither => 0,
            Extend::Min | Extend::Max => 1,
            Extend::Both => 2,
        }
    }

    pub fn extends_min(&self) -> bool {
        matches!(self, Extend::Min | Extend::Both)
    }

    pub fn extends_max(&self) -> bool {
        matches!(self, Extend::Max | Extend::Both)
    }
}

impl std::fmt::Display for Extend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colormap settings: one or more base palette names with per-component
/// discretization counts, plus bad/over/under decorations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmapSettings {
    /// Base palette names, list order = concatenation order. Always ≥ 1;
    /// a scalar in the source becomes a one-element vector.
    pub name: Vec<String>,
    /// Discretization counts, one per name. `None` = continuous.
    /// A scalar in the source is broadcast over all names.
    pub n: Option<Vec<usize>>,
    /// Color for missing data (default transparent).
    pub bad_color: Option<ColorValue>,
    /// Alpha override for the bad color, in `[0, 1]`.
    pub bad_alpha: Option<f64>,
    /// Color for values above the mapped range; `none` = no extension color.
    pub over_color: Option<ColorValue>,
    /// Color for values below the mapped range; `none` = no extension color.
    pub under_color: Option<ColorValue>,
}

impl CmapSettings {
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: vec![name.into()],
            n: None,
            bad_color: None,
            bad_alpha: None,
            over_color: None,
            under_color: None,
        }
    }

    /// Total discretization count across all components, if specified.
    pub fn total_n(&self) -> Option<usize> {
        self.n.as_ref().map(|ns| ns.iter().sum())
    }
}

impl Default for CmapSettings {
    fn default() -> Self {
        CmapSettings::single("viridis")
    }
}

/// Normalization settings, one variant per strategy, tagged by the `name`
/// field of the `norm` block.
///
/// The validator dispatches on the tag and builds exactly one variant;
/// fields belonging to other variants are ignored with a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum NormSettings {
    /// Linear normalization (the default when `norm` is absent).
    Norm {
        vmin: Option<f64>,
        vmax: Option<f64>,
        clip: bool,
    },
    /// Identity normalization: data is already a color index.
    NoNorm {
        vmin: Option<f64>,
        vmax: Option<f64>,
        clip: bool,
    },
    /// Stepped normalization driven by explicit bin edges.
    BoundaryNorm {
        /// Strictly increasing, length ≥ 2.
        boundaries: Vec<f64>,
        ncolors: Option<usize>,
        clip: bool,
        extend: Extend,
    },
    /// Normalization over a discrete set of integer-coded categories.
    CategoryNorm {
        /// `(code, label)` pairs, sorted by code, codes unique.
        categories: Vec<(i64, String)>,
    },
    /// Two linear slopes joined at `vcenter`.
    TwoSlopeNorm {
        vcenter: f64,
        vmin: Option<f64>,
        vmax: Option<f64>,
    },
    /// Symmetric range around `vcenter`.
    CenteredNorm {
        vcenter: f64,
        halfrange: Option<f64>,
        clip: bool,
    },
    /// Logarithmic normalization; `vmin`/`vmax` must be positive.
    LogNorm {
        vmin: Option<f64>,
        vmax: Option<f64>,
        clip: bool,
    },
    /// Symmetric log: linear inside `±linthresh`, logarithmic outside.
    SymLogNorm {
        linthresh: f64,
        linscale: f64,
        base: f64,
        vmin: Option<f64>,
        vmax: Option<f64>,
        clip: bool,
    },
    /// Power-law normalization.
    PowerNorm {
        gamma: f64,
        vmin: Option<f64>,
        vmax: Option<f64>,
        clip: bool,
    },
    /// Inverse hyperbolic sine normalization.
    AsinhNorm {
        linear_width: Option<f64>,
        vmin: Option<f64>,
        vmax: Option<f64>,
        clip: bool,
    },
}

impl NormSettings {
    pub const KNOWN_TAGS: [&'static str; 10] = [
        "Norm",
        "NoNorm",
        "BoundaryNorm",
        "CategoryNorm",
        "TwoSlopeNorm",
        "CenteredNorm",
        "LogNorm",
        "SymLogNorm",
        "PowerNorm",
        "AsinhNorm",
    ];

    /// The default linear norm.
    pub fn linear() -> Self {
        NormSettings::Norm {
            vmin: None,
            vmax: None,
            clip: false,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            NormSettings::Norm { .. } => "Norm",
            NormSettings::NoNorm { .. } => "NoNorm",
            NormSettings::BoundaryNorm { .. } => "BoundaryNorm",
            NormSettings::CategoryNorm { .. } => "CategoryNorm",
            NormSettings::TwoSlopeNorm { .. } => "TwoSlopeNorm",
            NormSettings::CenteredNorm { .. } => "CenteredNorm",
            NormSettings::LogNorm { .. } => "LogNorm",
            NormSettings::SymLogNorm { .. } => "SymLogNorm",
            NormSettings::PowerNorm { .. } => "PowerNorm",
            NormSettings::AsinhNorm { .. } => "AsinhNorm",
        }
    }

    /// Number of colors a discrete norm implies: bins plus one per active
    /// extension side for `BoundaryNorm`, category count for `CategoryNorm`.
    /// `None` for continuous norms.
    pub fn implied_ncolors(&self) -> Option<usize> {
        match self {
            NormSettings::BoundaryNorm {
                boundaries, extend, ..
            } => Some(boundaries.len().saturating_sub(1) + extend.extra_sides()),
            NormSettings::CategoryNorm { categories } => Some(categories.len()),
            _ => None,
        }
    }
}

impl Default for NormSettings {
    fn default() -> Self {
        NormSettings::linear()
    }
}

/// The `extendfrac` option: either automatic sizing or a fraction in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExtendFrac {
    Auto,
    Frac(f64),
}

/// Colorbar rendering directives.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CbarSettings {
    pub extend: Extend,
    pub extendfrac: Option<ExtendFrac>,
    pub extendrect: bool,
    pub label: Option<String>,
}

/// Free-form record metadata with a typed `category` tag list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuxiliaryInfo {
    /// Lowercase, sorted, deduplicated classification tags.
    pub category: Vec<String>,
    /// Everything else (citation, url, comment, ...) passed through opaquely.
    pub extra: BTreeMap<String, Value>,
}

impl AuxiliaryInfo {
    pub fn has_category(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.category.iter().any(|c| *c == tag)
    }
}

/// A validated record, possibly still referencing another record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorbarDef {
    pub name: String,
    /// Alias target; mutually exclusive with `cmap`/`norm`/`cbar`.
    pub reference: Option<String>,
    pub cmap: Option<CmapSettings>,
    pub norm: Option<NormSettings>,
    pub cbar: Option<CbarSettings>,
    pub auxiliary: AuxiliaryInfo,
}

/// A fully resolved, self-contained record: the only entity the registry
/// retains. Absent blocks have been replaced by defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorbarConfig {
    pub name: String,
    pub cmap: CmapSettings,
    pub norm: NormSettings,
    pub cbar: CbarSettings,
    pub auxiliary: AuxiliaryInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_parse() {
        assert_eq!(Extend::parse("both"), Some(Extend::Both));
        assert_eq!(Extend::parse("upward"), None);
        assert_eq!(Extend::Both.extra_sides(), 2);
        assert_eq!(Extend::Min.extra_sides(), 1);
        assert_eq!(Extend::Neither.extra_sides(), 0);
    }

    #[test]
    fn test_implied_ncolors_boundary() {
        let norm = NormSettings::BoundaryNorm {
            boundaries: vec![0.1, 0.5, 1.0, 2.0],
            ncolors: None,
            clip: false,
            extend: Extend::Max,
        };
        // 3 bins + 1 extension side
        assert_eq!(norm.implied_ncolors(), Some(4));
    }

    #[test]
    fn test_implied_ncolors_category() {
        let norm = NormSettings::CategoryNorm {
            categories: vec![(0, "Clear".into()), (1, "Liquid".into())],
        };
        assert_eq!(norm.implied_ncolors(), Some(2));
    }

    #[test]
    fn test_total_n() {
        let mut cmap = CmapSettings::single("viridis");
        assert_eq!(cmap.total_n(), None);
        cmap.n = Some(vec![6, 6]);
        assert_eq!(cmap.total_n(), Some(12));
    }

    #[test]
    fn test_category_tags() {
        let aux = AuxiliaryInfo {
            category: vec!["precipitation".into(), "radar".into()],
            extra: BTreeMap::new(),
        };
        assert!(aux.has_category("RADAR"));
        assert!(!aux.has_category("clouds"));
    }
}
