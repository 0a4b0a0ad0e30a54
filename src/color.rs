//! Color values as they appear in declarative records.
//!
//! Records may put a named color, a hex literal, a 3/4-element component
//! sequence, or the literal string `none` into a color slot. Only the
//! *format* is handled here; whether a named color actually exists is a
//! builder concern (the vocabulary is external).

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// An RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn opaque(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        if !hex_pattern().is_match(hex) {
            return Err(format!(
                "'{hex}' is not a valid hex color (expected #rgb, #rrggbb or #rrggbbaa)"
            ));
        }
        let digits = &hex[1..];
        let expand = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0) as f64 / 255.0;
        match digits.len() {
            3 => {
                let mut c = digits.chars();
                let dup = |ch: char| expand(&format!("{ch}{ch}"));
                let (r, g, b) = (
                    dup(c.next().unwrap_or('0')),
                    dup(c.next().unwrap_or('0')),
                    dup(c.next().unwrap_or('0')),
                );
                Ok(Rgba::opaque(r, g, b))
            }
            6 => Ok(Rgba::opaque(
                expand(&digits[0..2]),
                expand(&digits[2..4]),
                expand(&digits[4..6]),
            )),
            _ => Ok(Rgba::new(
                expand(&digits[0..2]),
                expand(&digits[2..4]),
                expand(&digits[4..6]),
                expand(&digits[6..8]),
            )),
        }
    }

    pub fn to_hex(&self) -> String {
        let ch = |v: f64| ((v.clamp(0.0, 1.0) * 255.0).round()) as u8;
        if (self.a - 1.0).abs() < f64::EPSILON {
            format!("#{:02x}{:02x}{:02x}", ch(self.r), ch(self.g), ch(self.b))
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                ch(self.r),
                ch(self.g),
                ch(self.b),
                ch(self.a)
            )
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.a = alpha.clamp(0.0, 1.0);
        self
    }

    /// Linear interpolation towards `other` at `t` in `[0, 1]`.
    pub fn lerp(self, other: Rgba, t: f64) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |x: f64, y: f64| x + (y - x) * t;
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

fn hex_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
            .expect("hex color pattern")
    })
}

/// What a record may put in a color slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorValue {
    /// Named color; existence checked by the builder, not the validator.
    Named(String),
    /// Literal color (hex string or component sequence).
    Rgba(Rgba),
    /// The literal `none`: omit / render transparent.
    None,
}

impl ColorValue {
    /// Parse a raw YAML value into a color. Errors are plain strings; the
    /// validator wraps them with a field path.
    pub fn parse(value: &Value) -> Result<ColorValue, String> {
        match value {
            Value::String(s) => {
                if s.eq_ignore_ascii_case("none") {
                    Ok(ColorValue::None)
                } else if s.starts_with('#') {
                    Rgba::from_hex(s).map(ColorValue::Rgba)
                } else {
                    Ok(ColorValue::Named(s.clone()))
                }
            }
            Value::Sequence(seq) => {
                if seq.len() != 3 && seq.len() != 4 {
                    return Err(format!(
                        "color sequence must have 3 or 4 components, got {}",
                        seq.len()
                    ));
                }
                let mut comps = [0.0_f64; 4];
                comps[3] = 1.0;
                for (i, v) in seq.iter().enumerate() {
                    let c = v
                        .as_f64()
                        .ok_or_else(|| format!("color component [{i}] must be a number"))?;
                    if !(0.0..=1.0).contains(&c) {
                        return Err(format!("color component [{i}] must be in [0, 1], got {c}"));
                    }
                    comps[i] = c;
                }
                Ok(ColorValue::Rgba(Rgba::new(
                    comps[0], comps[1], comps[2], comps[3],
                )))
            }
            other => Err(format!(
                "expected a named color, hex string, 'none' or RGB/RGBA sequence, got {other:?}"
            )),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ColorValue::None)
    }
}
