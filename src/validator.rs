//! Schema and variant validation for one raw record.
//!
//! Sibling blocks (`cmap`, `norm`, `cbar`, `auxiliary`, the shape rule) are
//! validated independently and every issue found is reported together in one
//! [`ConfigError::Schema`]. Within a single field's dependent checks the
//! first violation stops that field (e.g. boundary monotonicity reports only
//! the first offending index).
//!
//! Color *format* is checked here. Color and palette *vocabulary* is not:
//! that depends on the external palette table and belongs to the builder.

use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::color::ColorValue;
use crate::error::{ConfigError, ConfigResult, Diagnostic};
use crate::loader::RawRecord;
use crate::settings::{
    AuxiliaryInfo, CbarSettings, CmapSettings, ColorbarDef, Extend, ExtendFrac, NormSettings,
};

/// Rule code for schema errors.
const SCHEMA: &str = "CBAR010";
/// Rule code for advisory unused-variant-field warnings.
const UNUSED_FIELD: &str = "CBAR011";

/// A validated record plus any advisory warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub def: ColorbarDef,
    pub warnings: Vec<Diagnostic>,
}

/// Validate one raw record against the typed schema.
///
/// Returns the validated [`ColorbarDef`] (with advisory warnings) or a
/// [`ConfigError::Schema`] carrying one diagnostic per field issue.
pub fn validate_record(name: &str, raw: &RawRecord) -> ConfigResult<Validation> {
    let mut issues: Vec<Diagnostic> = Vec::new();

    let map = match raw.as_mapping() {
        Some(m) => m,
        None => {
            return Err(ConfigError::Schema {
                record: name.to_string(),
                issues: vec![Diagnostic::error(SCHEMA, "", "record must be a mapping")],
            });
        }
    };

    const KNOWN_KEYS: [&str; 5] = ["reference", "cmap", "norm", "cbar", "auxiliary"];
    for (key, _) in map {
        if let Some(k) = key.as_str() {
            if !KNOWN_KEYS.contains(&k) {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    k,
                    format!("unknown key '{k}' (known keys: {})", KNOWN_KEYS.join(", ")),
                ));
            }
        } else {
            issues.push(Diagnostic::error(
                SCHEMA,
                "",
                format!("record keys must be strings, got {key:?}"),
            ));
        }
    }

    let reference = match map.get("reference") {
        None => None,
        Some(v) => match v.as_str() {
            Some(s) if !s.is_empty() => Some(s.to_string()),
            _ => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "reference",
                    "'reference' must be a non-empty record name",
                ));
                None
            }
        },
    };

    // Shape rule: a record is either an alias or a definition, never both.
    if map.contains_key("reference") {
        for block in ["cmap", "norm", "cbar"] {
            if map.contains_key(block) {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    block,
                    format!("'{block}' cannot be combined with 'reference'"),
                ));
            }
        }
    } else if !map.contains_key("cmap") && !map.contains_key("norm") {
        issues.push(Diagnostic::error(
            SCHEMA,
            "",
            "record must declare 'reference' or at least one of 'cmap'/'norm'",
        ));
    }

    let cmap = map.get("cmap").and_then(|v| validate_cmap(v, &mut issues));
    let norm = map
        .get("norm")
        .and_then(|v| validate_norm(name, v, &mut issues));
    let cbar = map.get("cbar").and_then(|v| validate_cbar(v, &mut issues));
    let auxiliary = map
        .get("auxiliary")
        .map(|v| validate_auxiliary(v, &mut issues))
        .unwrap_or_default();

    if issues.iter().any(Diagnostic::is_error) {
        return Err(ConfigError::Schema {
            record: name.to_string(),
            issues,
        });
    }

    Ok(Validation {
        def: ColorbarDef {
            name: name.to_string(),
            reference,
            cmap,
            norm,
            cbar,
            auxiliary,
        },
        warnings: issues,
    })
}

// ---------------------------------------------------------------------------
// cmap block

fn validate_cmap(value: &Value, issues: &mut Vec<Diagnostic>) -> Option<CmapSettings> {
    let map = match value.as_mapping() {
        Some(m) => m,
        None => {
            issues.push(Diagnostic::error(SCHEMA, "cmap", "'cmap' must be a mapping"));
            return None;
        }
    };

    const KNOWN: [&str; 6] = [
        "name",
        "n",
        "bad_color",
        "bad_alpha",
        "over_color",
        "under_color",
    ];
    unknown_key_errors(map, "cmap", &KNOWN, issues);

    let names: Option<Vec<String>> = match map.get("name") {
        None => {
            issues.push(Diagnostic::error(
                SCHEMA,
                "cmap.name",
                "'name' is required in the cmap block",
            ));
            None
        }
        Some(Value::String(s)) => Some(vec![s.clone()]),
        Some(Value::Sequence(seq)) => {
            if seq.is_empty() {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "cmap.name",
                    "'name' sequence must not be empty",
                ));
                None
            } else {
                let mut out = Vec::with_capacity(seq.len());
                let mut good = true;
                for (i, item) in seq.iter().enumerate() {
                    match item.as_str() {
                        Some(s) => out.push(s.to_string()),
                        None => {
                            issues.push(Diagnostic::error(
                                SCHEMA,
                                format!("cmap.name[{i}]"),
                                "colormap names must be strings",
                            ));
                            good = false;
                            break;
                        }
                    }
                }
                good.then_some(out)
            }
        }
        Some(_) => {
            issues.push(Diagnostic::error(
                SCHEMA,
                "cmap.name",
                "'name' must be a string or a sequence of strings",
            ));
            None
        }
    };

    let n: Option<Vec<usize>> = match map.get("n") {
        None => None,
        Some(v) => match (v, &names) {
            (Value::Sequence(seq), Some(names)) => {
                if seq.len() != names.len() {
                    issues.push(Diagnostic::error(
                        SCHEMA,
                        "cmap.n",
                        format!(
                            "'n' has {} entries but 'name' has {} colormaps",
                            seq.len(),
                            names.len()
                        ),
                    ));
                    None
                } else {
                    parse_counts(seq, issues)
                }
            }
            (Value::Sequence(_), None) => None, // name already failed; skip
            (scalar, _) => match positive_count(scalar) {
                Some(k) => names.as_ref().map(|names| vec![k; names.len()]),
                None => {
                    issues.push(Diagnostic::error(
                        SCHEMA,
                        "cmap.n",
                        "'n' must be a positive integer or a sequence of positive integers",
                    ));
                    None
                }
            },
        },
    };

    let bad_color = color_slot(map, "cmap", "bad_color", issues);
    let over_color = color_slot(map, "cmap", "over_color", issues);
    let under_color = color_slot(map, "cmap", "under_color", issues);

    let bad_alpha = match map.get("bad_alpha") {
        None => None,
        Some(v) => match v.as_f64() {
            Some(a) if (0.0..=1.0).contains(&a) => Some(a),
            _ => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "cmap.bad_alpha",
                    "'bad_alpha' must be a number in [0, 1]",
                ));
                None
            }
        },
    };

    names.map(|name| CmapSettings {
        name,
        n,
        bad_color,
        bad_alpha,
        over_color,
        under_color,
    })
}

fn parse_counts(seq: &[Value], issues: &mut Vec<Diagnostic>) -> Option<Vec<usize>> {
    let mut out = Vec::with_capacity(seq.len());
    for (i, v) in seq.iter().enumerate() {
        match positive_count(v) {
            Some(k) => out.push(k),
            None => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    format!("cmap.n[{i}]"),
                    "'n' values must be positive integers",
                ));
                return None;
            }
        }
    }
    Some(out)
}

fn positive_count(v: &Value) -> Option<usize> {
    match v.as_u64() {
        Some(k) if k >= 1 => Some(k as usize),
        _ => None,
    }
}

fn color_slot(
    map: &Mapping,
    block: &str,
    key: &str,
    issues: &mut Vec<Diagnostic>,
) -> Option<ColorValue> {
    let v = map.get(key)?;
    match ColorValue::parse(v) {
        Ok(c) => Some(c),
        Err(detail) => {
            issues.push(Diagnostic::error(SCHEMA, format!("{block}.{key}"), detail));
            None
        }
    }
}

// ---------------------------------------------------------------------------
// norm block

fn validate_norm(record: &str, value: &Value, issues: &mut Vec<Diagnostic>) -> Option<NormSettings> {
    let map = match value.as_mapping() {
        Some(m) => m,
        None => {
            issues.push(Diagnostic::error(SCHEMA, "norm", "'norm' must be a mapping"));
            return None;
        }
    };

    // A norm block without a `name` tag means plain linear normalization.
    let tag = match map.get("name") {
        None => "Norm",
        Some(v) => match v.as_str() {
            Some(s) => s,
            None => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "norm.name",
                    "'name' must be a string",
                ));
                return None;
            }
        },
    };

    if !NormSettings::KNOWN_TAGS.contains(&tag) {
        issues.push(Diagnostic::error(
            SCHEMA,
            "norm.name",
            format!(
                "unknown norm '{tag}'. Valid norms: {}",
                NormSettings::KNOWN_TAGS.join(", ")
            ),
        ));
        return None;
    }

    let allowed: &[&str] = match tag {
        "Norm" | "NoNorm" | "LogNorm" => &["vmin", "vmax", "clip"],
        "BoundaryNorm" => &["boundaries", "ncolors", "clip", "extend"],
        "CategoryNorm" => &["categories"],
        "TwoSlopeNorm" => &["vcenter", "vmin", "vmax"],
        "CenteredNorm" => &["vcenter", "halfrange", "clip"],
        "SymLogNorm" => &["linthresh", "linscale", "base", "vmin", "vmax", "clip"],
        "PowerNorm" => &["gamma", "vmin", "vmax", "clip"],
        "AsinhNorm" => &["linear_width", "vmin", "vmax", "clip"],
        _ => unreachable!("tag checked against KNOWN_TAGS"),
    };

    // Fields of other variants are advisory only, never an error.
    for (key, _) in map {
        if let Some(k) = key.as_str() {
            if k != "name" && !allowed.contains(&k) {
                warn!(record, field = k, norm = tag, "ignoring field of inactive norm variant");
                issues.push(Diagnostic::warn(
                    UNUSED_FIELD,
                    format!("norm.{k}"),
                    format!("'{k}' does not apply to {tag} and is ignored"),
                ));
            }
        }
    }

    // Only pull the shared fields the active variant declares; anything else
    // was already covered by the advisory pass above.
    let vmin = allowed
        .contains(&"vmin")
        .then(|| opt_f64(map, "vmin", issues))
        .flatten();
    let vmax = allowed
        .contains(&"vmax")
        .then(|| opt_f64(map, "vmax", issues))
        .flatten();
    let clip = allowed.contains(&"clip") && opt_bool(map, "norm", "clip", issues);

    match tag {
        "Norm" | "NoNorm" => {
            check_range(vmin, vmax, issues);
            Some(if tag == "Norm" {
                NormSettings::Norm { vmin, vmax, clip }
            } else {
                NormSettings::NoNorm { vmin, vmax, clip }
            })
        }
        "LogNorm" => {
            for (key, v) in [("vmin", vmin), ("vmax", vmax)] {
                if let Some(x) = v {
                    if x <= 0.0 {
                        issues.push(Diagnostic::error(
                            SCHEMA,
                            format!("norm.{key}"),
                            format!("'{key}' must be positive for LogNorm, got {x}"),
                        ));
                    }
                }
            }
            check_range(vmin, vmax, issues);
            Some(NormSettings::LogNorm { vmin, vmax, clip })
        }
        "BoundaryNorm" => validate_boundary_norm(map, clip, issues),
        "CategoryNorm" => validate_category_norm(map, issues),
        "TwoSlopeNorm" => {
            let vcenter = match req_f64(map, "norm", "vcenter", issues) {
                Some(v) => v,
                None => return None,
            };
            if let Some(lo) = vmin {
                if lo >= vcenter {
                    issues.push(Diagnostic::error(
                        SCHEMA,
                        "norm.vmin",
                        format!("'vmin' ({lo}) must be less than 'vcenter' ({vcenter})"),
                    ));
                }
            }
            if let Some(hi) = vmax {
                if vcenter >= hi {
                    issues.push(Diagnostic::error(
                        SCHEMA,
                        "norm.vmax",
                        format!("'vcenter' ({vcenter}) must be less than 'vmax' ({hi})"),
                    ));
                }
            }
            Some(NormSettings::TwoSlopeNorm { vcenter, vmin, vmax })
        }
        "CenteredNorm" => {
            let vcenter = opt_f64(map, "vcenter", issues).unwrap_or(0.0);
            let halfrange = opt_f64(map, "halfrange", issues);
            if let Some(h) = halfrange {
                if h <= 0.0 {
                    issues.push(Diagnostic::error(
                        SCHEMA,
                        "norm.halfrange",
                        format!("'halfrange' must be positive, got {h}"),
                    ));
                }
            }
            Some(NormSettings::CenteredNorm {
                vcenter,
                halfrange,
                clip,
            })
        }
        "SymLogNorm" => {
            let linthresh = match req_f64(map, "norm", "linthresh", issues) {
                Some(v) => v,
                None => return None,
            };
            if linthresh <= 0.0 {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "norm.linthresh",
                    format!("'linthresh' must be positive, got {linthresh}"),
                ));
            }
            let linscale = opt_f64(map, "linscale", issues).unwrap_or(1.0);
            if linscale <= 0.0 {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "norm.linscale",
                    format!("'linscale' must be positive, got {linscale}"),
                ));
            }
            let base = opt_f64(map, "base", issues).unwrap_or(10.0);
            if base <= 1.0 {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "norm.base",
                    format!("'base' must be greater than 1, got {base}"),
                ));
            }
            check_range(vmin, vmax, issues);
            Some(NormSettings::SymLogNorm {
                linthresh,
                linscale,
                base,
                vmin,
                vmax,
                clip,
            })
        }
        "PowerNorm" => {
            let gamma = match req_f64(map, "norm", "gamma", issues) {
                Some(v) => v,
                None => return None,
            };
            check_range(vmin, vmax, issues);
            Some(NormSettings::PowerNorm {
                gamma,
                vmin,
                vmax,
                clip,
            })
        }
        "AsinhNorm" => {
            let linear_width = opt_f64(map, "linear_width", issues);
            if let Some(w) = linear_width {
                if w <= 0.0 {
                    issues.push(Diagnostic::error(
                        SCHEMA,
                        "norm.linear_width",
                        format!("'linear_width' must be positive, got {w}"),
                    ));
                }
            }
            check_range(vmin, vmax, issues);
            Some(NormSettings::AsinhNorm {
                linear_width,
                vmin,
                vmax,
                clip,
            })
        }
        _ => unreachable!("tag checked against KNOWN_TAGS"),
    }
}

fn validate_boundary_norm(
    map: &Mapping,
    clip: bool,
    issues: &mut Vec<Diagnostic>,
) -> Option<NormSettings> {
    let extend = match map.get("extend") {
        None => Extend::Neither,
        Some(v) => match v.as_str().and_then(Extend::parse) {
            Some(e) => e,
            None => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "norm.extend",
                    format!("'extend' must be one of: {}", Extend::LITERALS.join(", ")),
                ));
                Extend::Neither
            }
        },
    };

    let boundaries: Option<Vec<f64>> = match map.get("boundaries") {
        None => {
            issues.push(Diagnostic::error(
                SCHEMA,
                "norm.boundaries",
                "'boundaries' is required for BoundaryNorm",
            ));
            None
        }
        Some(Value::Sequence(seq)) => {
            if seq.len() < 2 {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "norm.boundaries",
                    format!("at least 2 boundaries are required, got {}", seq.len()),
                ));
                None
            } else {
                parse_boundaries(seq, issues)
            }
        }
        Some(_) => {
            issues.push(Diagnostic::error(
                SCHEMA,
                "norm.boundaries",
                "'boundaries' must be a sequence of numbers",
            ));
            None
        }
    };

    let ncolors = match map.get("ncolors") {
        None => None,
        Some(v) => match v.as_u64() {
            Some(k) => Some(k as usize),
            None => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "norm.ncolors",
                    "'ncolors' must be an integer",
                ));
                None
            }
        },
    };
    if let Some(nc) = ncolors {
        if nc < 2 {
            issues.push(Diagnostic::error(
                SCHEMA,
                "norm.ncolors",
                format!("'ncolors' must be at least 2, got {nc}"),
            ));
        } else if let Some(b) = &boundaries {
            let implied = b.len() - 1 + extend.extra_sides();
            if nc < implied {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "norm.ncolors",
                    format!("'ncolors' must be at least {implied} with extend '{extend}'"),
                ));
            }
        }
    }

    boundaries.map(|boundaries| NormSettings::BoundaryNorm {
        boundaries,
        ncolors,
        clip,
        extend,
    })
}

/// Parse boundary values, stopping at the first violation of strict
/// monotonicity.
fn parse_boundaries(seq: &[Value], issues: &mut Vec<Diagnostic>) -> Option<Vec<f64>> {
    let mut out = Vec::with_capacity(seq.len());
    for (i, v) in seq.iter().enumerate() {
        match v.as_f64() {
            Some(x) if x.is_finite() => out.push(x),
            _ => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    format!("norm.boundaries[{i}]"),
                    "boundaries must be finite numbers",
                ));
                return None;
            }
        }
    }
    for i in 1..out.len() {
        if out[i] <= out[i - 1] {
            issues.push(Diagnostic::error(
                SCHEMA,
                format!("norm.boundaries[{i}]"),
                format!(
                    "boundaries must be strictly increasing ({} does not increase over {})",
                    out[i],
                    out[i - 1]
                ),
            ));
            return None;
        }
    }
    Some(out)
}

fn validate_category_norm(map: &Mapping, issues: &mut Vec<Diagnostic>) -> Option<NormSettings> {
    let cats = match map.get("categories") {
        None => {
            issues.push(Diagnostic::error(
                SCHEMA,
                "norm.categories",
                "'categories' is required for CategoryNorm",
            ));
            return None;
        }
        Some(Value::Mapping(m)) => m,
        Some(_) => {
            issues.push(Diagnostic::error(
                SCHEMA,
                "norm.categories",
                "'categories' must be a mapping of integer code to label",
            ));
            return None;
        }
    };

    let mut entries: Vec<(i64, String)> = Vec::with_capacity(cats.len());
    for (key, label) in cats {
        // String keys like "1" coerce to their integer code.
        let code = match key {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        };
        let code = match code {
            Some(c) => c,
            None => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "norm.categories",
                    format!("category codes must be integers, got {key:?}"),
                ));
                return None;
            }
        };
        let label = match label.as_str() {
            Some(s) => s.to_string(),
            None => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "norm.categories",
                    format!("label for category {code} must be a string"),
                ));
                return None;
            }
        };
        if entries.iter().any(|(c, _)| *c == code) {
            issues.push(Diagnostic::error(
                SCHEMA,
                "norm.categories",
                format!("duplicate category code {code}"),
            ));
            return None;
        }
        entries.push((code, label));
    }

    if entries.len() < 2 {
        issues.push(Diagnostic::error(
            SCHEMA,
            "norm.categories",
            format!("at least 2 categories are required, got {}", entries.len()),
        ));
        return None;
    }

    // Codes need not be contiguous; store in code order.
    entries.sort_by_key(|(code, _)| *code);
    Some(NormSettings::CategoryNorm {
        categories: entries,
    })
}

// ---------------------------------------------------------------------------
// cbar block

fn validate_cbar(value: &Value, issues: &mut Vec<Diagnostic>) -> Option<CbarSettings> {
    let map = match value.as_mapping() {
        Some(m) => m,
        None => {
            issues.push(Diagnostic::error(SCHEMA, "cbar", "'cbar' must be a mapping"));
            return None;
        }
    };

    const KNOWN: [&str; 4] = ["extend", "extendfrac", "extendrect", "label"];
    unknown_key_errors(map, "cbar", &KNOWN, issues);

    let extend = match map.get("extend") {
        None => Extend::Neither,
        Some(v) => match v.as_str().and_then(Extend::parse) {
            Some(e) => e,
            None => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "cbar.extend",
                    format!("'extend' must be one of: {}", Extend::LITERALS.join(", ")),
                ));
                Extend::Neither
            }
        },
    };

    let extendfrac = match map.get("extendfrac") {
        None => None,
        Some(Value::String(s)) if s == "auto" => Some(ExtendFrac::Auto),
        Some(v) => match v.as_f64() {
            Some(f) if f > 0.0 && f <= 1.0 => Some(ExtendFrac::Frac(f)),
            _ => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "cbar.extendfrac",
                    "'extendfrac' must be 'auto' or a number in (0, 1]",
                ));
                None
            }
        },
    };

    let extendrect = opt_bool(map, "cbar", "extendrect", issues);

    let label = match map.get("label") {
        None => None,
        Some(v) => match v.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "cbar.label",
                    "'label' must be a string",
                ));
                None
            }
        },
    };

    Some(CbarSettings {
        extend,
        extendfrac,
        extendrect,
        label,
    })
}

// ---------------------------------------------------------------------------
// auxiliary block

fn validate_auxiliary(value: &Value, issues: &mut Vec<Diagnostic>) -> AuxiliaryInfo {
    let map = match value.as_mapping() {
        Some(m) => m,
        None => {
            issues.push(Diagnostic::error(
                SCHEMA,
                "auxiliary",
                "'auxiliary' must be a mapping",
            ));
            return AuxiliaryInfo::default();
        }
    };

    let mut aux = AuxiliaryInfo::default();
    for (key, v) in map {
        let k = match key.as_str() {
            Some(s) => s,
            None => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    "auxiliary",
                    format!("auxiliary keys must be strings, got {key:?}"),
                ));
                continue;
            }
        };
        if k == "category" {
            aux.category = category_tags(v, issues);
        } else {
            // Unrecognized metadata passes through unchanged.
            aux.extra.insert(k.to_string(), v.clone());
        }
    }
    aux
}

/// Normalize `category` (scalar or sequence) to sorted, deduplicated,
/// lowercase tags.
fn category_tags(value: &Value, issues: &mut Vec<Diagnostic>) -> Vec<String> {
    let mut tags: Vec<String> = match value {
        Value::String(s) => vec![s.to_lowercase()],
        Value::Sequence(seq) => {
            let mut out = Vec::with_capacity(seq.len());
            for (i, item) in seq.iter().enumerate() {
                match item.as_str() {
                    Some(s) => out.push(s.to_lowercase()),
                    None => {
                        issues.push(Diagnostic::error(
                            SCHEMA,
                            format!("auxiliary.category[{i}]"),
                            "category tags must be strings",
                        ));
                        return Vec::new();
                    }
                }
            }
            out
        }
        _ => {
            issues.push(Diagnostic::error(
                SCHEMA,
                "auxiliary.category",
                "'category' must be a string or a sequence of strings",
            ));
            return Vec::new();
        }
    };
    tags.sort();
    tags.dedup();
    tags
}

// ---------------------------------------------------------------------------
// shared helpers

fn unknown_key_errors(map: &Mapping, block: &str, known: &[&str], issues: &mut Vec<Diagnostic>) {
    for (key, _) in map {
        if let Some(k) = key.as_str() {
            if !known.contains(&k) {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    format!("{block}.{k}"),
                    format!("unknown field '{k}' in the {block} block"),
                ));
            }
        }
    }
}

fn opt_f64(map: &Mapping, key: &str, issues: &mut Vec<Diagnostic>) -> Option<f64> {
    let v = map.get(key)?;
    match v.as_f64() {
        Some(x) if x.is_finite() => Some(x),
        _ => {
            issues.push(Diagnostic::error(
                SCHEMA,
                format!("norm.{key}"),
                format!("'{key}' must be a finite number"),
            ));
            None
        }
    }
}

fn req_f64(map: &Mapping, block: &str, key: &str, issues: &mut Vec<Diagnostic>) -> Option<f64> {
    if !map.contains_key(key) {
        issues.push(Diagnostic::error(
            SCHEMA,
            format!("{block}.{key}"),
            format!("'{key}' is required"),
        ));
        return None;
    }
    opt_f64(map, key, issues)
}

fn opt_bool(map: &Mapping, block: &str, key: &str, issues: &mut Vec<Diagnostic>) -> bool {
    match map.get(key) {
        None => false,
        Some(v) => match v.as_bool() {
            Some(b) => b,
            None => {
                issues.push(Diagnostic::error(
                    SCHEMA,
                    format!("{block}.{key}"),
                    format!("'{key}' must be a boolean"),
                ));
                false
            }
        },
    }
}

fn check_range(vmin: Option<f64>, vmax: Option<f64>, issues: &mut Vec<Diagnostic>) {
    if let (Some(lo), Some(hi)) = (vmin, vmax) {
        if lo >= hi {
            issues.push(Diagnostic::error(
                SCHEMA,
                "norm.vmin",
                format!("'vmin' ({lo}) must be less than 'vmax' ({hi})"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(yaml: &str) -> RawRecord {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn issues_of(err: ConfigError) -> Vec<Diagnostic> {
        match err {
            ConfigError::Schema { issues, .. } => issues,
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_boundary_norm_valid() {
        let v = validate_record(
            "x",
            &raw("norm: {name: BoundaryNorm, boundaries: [0.1, 0.2, 0.3]}"),
        )
        .unwrap();
        assert!(matches!(
            v.def.norm,
            Some(NormSettings::BoundaryNorm { .. })
        ));
    }

    #[test]
    fn test_boundary_norm_monotonicity_fails_at_first_violation() {
        let err = validate_record(
            "x",
            &raw("norm: {name: BoundaryNorm, boundaries: [0.3, 0.2, 0.1]}"),
        )
        .unwrap_err();
        let issues = issues_of(err);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "norm.boundaries[1]");
    }

    #[test]
    fn test_boundary_norm_ncolors_below_implied() {
        let err = validate_record(
            "x",
            &raw("norm: {name: BoundaryNorm, boundaries: [0, 1, 2, 3], extend: both, ncolors: 3}"),
        )
        .unwrap_err();
        let issues = issues_of(err);
        // 3 bins + 2 extension sides = 5 required
        assert!(issues[0].message.contains("at least 5"), "{:?}", issues);
    }

    #[test]
    fn test_two_slope_ordering() {
        let err = validate_record(
            "x",
            &raw("norm: {name: TwoSlopeNorm, vmin: 0.0, vcenter: -1.0, vmax: 1.0}"),
        )
        .unwrap_err();
        let issues = issues_of(err);
        assert_eq!(issues[0].path, "norm.vmin");
    }

    #[test]
    fn test_unknown_norm_tag_lists_known_set() {
        let err = validate_record("x", &raw("norm: {name: RainbowNorm}")).unwrap_err();
        let issues = issues_of(err);
        assert!(issues[0].message.contains("BoundaryNorm"));
        assert!(issues[0].message.contains("SymLogNorm"));
    }

    #[test]
    fn test_missing_norm_name_defaults_to_linear() {
        let v = validate_record("x", &raw("norm: {vmin: 0.0, vmax: 1.0}")).unwrap();
        assert!(matches!(v.def.norm, Some(NormSettings::Norm { .. })));
    }

    #[test]
    fn test_category_duplicate_code_rejected() {
        // "1" coerces to 1 and collides with the numeric key
        let err = validate_record(
            "x",
            &raw("norm: {name: CategoryNorm, categories: {1: A, \"1\": B, 2: C}}"),
        )
        .unwrap_err();
        let issues = issues_of(err);
        assert!(issues[0].message.contains("duplicate category code 1"));
    }

    #[test]
    fn test_category_codes_sorted_not_contiguous() {
        let v = validate_record(
            "x",
            &raw("norm: {name: CategoryNorm, categories: {7: High, 1: Low, 4: Mid}}"),
        )
        .unwrap();
        match v.def.norm.unwrap() {
            NormSettings::CategoryNorm { categories } => {
                let codes: Vec<i64> = categories.iter().map(|(c, _)| *c).collect();
                assert_eq!(codes, vec![1, 4, 7]);
            }
            other => panic!("expected category norm, got {other:?}"),
        }
    }

    #[test]
    fn test_reference_mutually_exclusive_with_cmap() {
        let err = validate_record(
            "x",
            &raw("reference: other\ncmap: {name: viridis}"),
        )
        .unwrap_err();
        let issues = issues_of(err);
        assert_eq!(issues[0].path, "cmap");
    }

    #[test]
    fn test_empty_record_rejected() {
        let err = validate_record("x", &raw("auxiliary: {comment: hi}")).unwrap_err();
        let issues = issues_of(err);
        assert!(issues[0].message.contains("'reference' or at least one"));
    }

    #[test]
    fn test_sibling_blocks_collect_all_errors() {
        let err = validate_record(
            "x",
            &raw("cmap: {name: [viridis], n: [2, 3]}\nnorm: {name: BoundaryNorm, boundaries: [3, 2]}"),
        )
        .unwrap_err();
        let issues = issues_of(err);
        let paths: Vec<&str> = issues.iter().map(|d| d.path.as_str()).collect();
        assert!(paths.contains(&"cmap.n"), "{paths:?}");
        assert!(paths.contains(&"norm.boundaries[1]"), "{paths:?}");
    }

    #[test]
    fn test_scalar_n_broadcast_over_names() {
        let v = validate_record("x", &raw("cmap: {name: [viridis, magma], n: 8}")).unwrap();
        assert_eq!(v.def.cmap.unwrap().n, Some(vec![8, 8]));
    }

    #[test]
    fn test_n_length_mismatch() {
        let err = validate_record("x", &raw("cmap: {name: [viridis, magma], n: [8]}")).unwrap_err();
        let issues = issues_of(err);
        assert_eq!(issues[0].path, "cmap.n");
    }

    #[test]
    fn test_unused_variant_field_is_warning_only() {
        let v = validate_record(
            "x",
            &raw("norm: {name: BoundaryNorm, boundaries: [0, 1], linthresh: 2.0}"),
        )
        .unwrap();
        assert_eq!(v.warnings.len(), 1);
        assert_eq!(v.warnings[0].code, "CBAR011");
        assert_eq!(v.warnings[0].path, "norm.linthresh");
    }

    #[test]
    fn test_symlog_constraints() {
        let err = validate_record(
            "x",
            &raw("norm: {name: SymLogNorm, linthresh: -1.0, base: 1.0}"),
        )
        .unwrap_err();
        let issues = issues_of(err);
        let paths: Vec<&str> = issues.iter().map(|d| d.path.as_str()).collect();
        assert!(paths.contains(&"norm.linthresh"));
        assert!(paths.contains(&"norm.base"));
    }

    #[test]
    fn test_cbar_extendfrac_range() {
        let err = validate_record(
            "x",
            &raw("cmap: {name: viridis}\ncbar: {extendfrac: 1.5}"),
        )
        .unwrap_err();
        let issues = issues_of(err);
        assert_eq!(issues[0].path, "cbar.extendfrac");

        let ok = validate_record(
            "x",
            &raw("cmap: {name: viridis}\ncbar: {extendfrac: auto}"),
        )
        .unwrap();
        assert_eq!(ok.def.cbar.unwrap().extendfrac, Some(ExtendFrac::Auto));
    }

    #[test]
    fn test_cbar_extend_literal() {
        let err = validate_record(
            "x",
            &raw("cmap: {name: viridis}\ncbar: {extend: up}"),
        )
        .unwrap_err();
        let issues = issues_of(err);
        assert!(issues[0].message.contains("neither, min, max, both"));
    }

    #[test]
    fn test_auxiliary_category_normalized() {
        let v = validate_record(
            "x",
            &raw("cmap: {name: viridis}\nauxiliary: {category: [Radar, precipitation, RADAR], citation: someone}"),
        )
        .unwrap();
        let aux = v.def.auxiliary;
        assert_eq!(aux.category, vec!["precipitation", "radar"]);
        assert!(aux.extra.contains_key("citation"));
    }

    #[test]
    fn test_bad_alpha_range() {
        let err = validate_record("x", &raw("cmap: {name: viridis, bad_alpha: 1.5}")).unwrap_err();
        let issues = issues_of(err);
        assert_eq!(issues[0].path, "cmap.bad_alpha");
    }

    #[test]
    fn test_color_format_checked_vocabulary_deferred() {
        // A plainly impossible hex string fails here...
        let err =
            validate_record("x", &raw("cmap: {name: viridis, bad_color: \"#zz\"}")).unwrap_err();
        assert!(!issues_of(err).is_empty());
        // ...but an unknown *named* color passes validation (builder's concern).
        let ok = validate_record("x", &raw("cmap: {name: viridis, bad_color: vantablack}"));
        assert!(ok.is_ok());
    }
}
