//! Base palette vocabulary used by the colormap builder.
//!
//! The plotting ecosystem's palette table is a collaborator interface, so
//! the builder only depends on [`PaletteProvider`]. [`PaletteTable`] is the
//! self-contained default: a built-in set of stop lists with linear
//! interpolation, extendable with user palettes from YAML or GMT `.cpt`
//! files.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_yaml::Value;
use tracing::debug;

use crate::color::Rgba;
use crate::error::{ConfigError, ConfigResult};

/// An ordered list of color stops, evenly spaced, linearly interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    stops: Vec<Rgba>,
}

impl Palette {
    pub fn new(stops: Vec<Rgba>) -> Self {
        Self { stops }
    }

    pub fn stops(&self) -> &[Rgba] {
        &self.stops
    }

    /// Sample the palette at `t` in `[0, 1]`.
    pub fn sample(&self, t: f64) -> Rgba {
        match self.stops.len() {
            0 => Rgba::TRANSPARENT,
            1 => self.stops[0],
            len => {
                let pos = t.clamp(0.0, 1.0) * (len - 1) as f64;
                let lo = pos.floor() as usize;
                let hi = pos.ceil() as usize;
                self.stops[lo].lerp(self.stops[hi], pos - lo as f64)
            }
        }
    }

    /// `n` evenly spaced samples spanning the full range.
    pub fn sample_n(&self, n: usize) -> Vec<Rgba> {
        match n {
            0 => Vec::new(),
            1 => vec![self.sample(0.5)],
            _ => (0..n)
                .map(|i| self.sample(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }

    /// The same palette with reversed stop order.
    pub fn reversed(&self) -> Palette {
        let mut stops = self.stops.clone();
        stops.reverse();
        Palette { stops }
    }
}

/// Lookup interface the builder depends on.
///
/// Implementations must honor the reserved `_r` suffix: `<name>_r` is the
/// palette `<name>` with reversed stop order, mechanically derived and never
/// a registered name in its own right.
pub trait PaletteProvider {
    /// Look up a palette by name (including `_r` variants).
    fn lookup(&self, name: &str) -> Option<Palette>;
    /// Look up a named color (e.g. `gray`, `darkred`).
    fn named_color(&self, name: &str) -> Option<Rgba>;
    /// Registered palette names, sorted.
    fn names(&self) -> Vec<String>;
}

/// Self-contained palette table: built-in palettes plus user additions.
#[derive(Debug, Clone)]
pub struct PaletteTable {
    palettes: HashMap<String, Palette>,
}

impl Default for PaletteTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PaletteTable {
    /// An empty table (tests, fully user-supplied vocabularies).
    pub fn empty() -> Self {
        Self {
            palettes: HashMap::new(),
        }
    }

    /// The built-in table: perceptually uniform maps, a set of ColorBrewer
    /// schemes, `gray`, and one qualitative set.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (name, hex) in BUILTIN_PALETTES {
            table.insert(*name, stops(hex));
        }
        table
    }

    pub fn insert(&mut self, name: impl Into<String>, palette: Palette) {
        self.palettes.insert(name.into(), palette);
    }

    /// Load user palettes from a YAML file: a mapping of palette name to a
    /// `colors:` list of hex stops.
    pub fn load_yaml_file(&mut self, path: &Path) -> ConfigResult<()> {
        let origin = path.display().to_string();
        let text =
            fs::read_to_string(path).map_err(|e| ConfigError::load(&origin, e.to_string()))?;
        let doc: Value =
            serde_yaml::from_str(&text).map_err(|e| ConfigError::load(&origin, e.to_string()))?;
        let map = doc.as_mapping().ok_or_else(|| {
            ConfigError::load(&origin, "top level must be a mapping of palette name to spec")
        })?;
        for (key, spec) in map {
            let name = key.as_str().ok_or_else(|| {
                ConfigError::load(&origin, format!("palette names must be strings, got {key:?}"))
            })?;
            let colors = spec
                .get("colors")
                .and_then(Value::as_sequence)
                .ok_or_else(|| {
                    ConfigError::load(&origin, format!("palette '{name}' needs a 'colors' list"))
                })?;
            let mut parsed = Vec::with_capacity(colors.len());
            for c in colors {
                let hex = c.as_str().ok_or_else(|| {
                    ConfigError::load(&origin, format!("palette '{name}' colors must be strings"))
                })?;
                let rgba = Rgba::from_hex(hex)
                    .map_err(|e| ConfigError::load(&origin, format!("palette '{name}': {e}")))?;
                parsed.push(rgba);
            }
            if parsed.len() < 2 {
                return Err(ConfigError::load(
                    &origin,
                    format!("palette '{name}' needs at least 2 color stops"),
                ));
            }
            debug!(palette = name, stops = parsed.len(), "loaded user palette");
            self.insert(name, Palette::new(parsed));
        }
        Ok(())
    }

    /// Load a GMT `.cpt` palette file; the palette is named after the file
    /// stem. Stop spacing is taken as even (the z-positions only order the
    /// stops).
    pub fn load_cpt_file(&mut self, path: &Path) -> ConfigResult<()> {
        let origin = path.display().to_string();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::load(&origin, "cannot derive a palette name"))?
            .to_string();
        let text =
            fs::read_to_string(path).map_err(|e| ConfigError::load(&origin, e.to_string()))?;

        let mut parsed: Vec<(f64, Rgba)> = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            // Comments and the B/F/N (background/foreground/nan) rows carry
            // no gradient stops.
            if line.is_empty() || line.starts_with('#') || line.starts_with(['B', 'F', 'N']) {
                continue;
            }
            let fields: Vec<f64> = line
                .split_whitespace()
                .map(|f| f.parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|_| {
                    ConfigError::load(&origin, format!("line {}: expected numbers", lineno + 1))
                })?;
            if fields.len() != 8 {
                return Err(ConfigError::load(
                    &origin,
                    format!("line {}: expected 'z r g b z r g b'", lineno + 1),
                ));
            }
            let rgb = |r: f64, g: f64, b: f64| Rgba::opaque(r / 255.0, g / 255.0, b / 255.0);
            parsed.push((fields[0], rgb(fields[1], fields[2], fields[3])));
            parsed.push((fields[4], rgb(fields[5], fields[6], fields[7])));
        }
        if parsed.len() < 2 {
            return Err(ConfigError::load(&origin, "no color segments found"));
        }
        parsed.sort_by(|a, b| a.0.total_cmp(&b.0));
        parsed.dedup_by(|a, b| a.0 == b.0);
        let stops: Vec<Rgba> = parsed.into_iter().map(|(_, c)| c).collect();
        debug!(palette = %name, stops = stops.len(), "loaded cpt palette");
        self.insert(name, Palette::new(stops));
        Ok(())
    }
}

impl PaletteProvider for PaletteTable {
    fn lookup(&self, name: &str) -> Option<Palette> {
        if let Some(p) = self.palettes.get(name) {
            return Some(p.clone());
        }
        // `_r` is the mechanically reversed variant.
        name.strip_suffix("_r")
            .and_then(|base| self.palettes.get(base))
            .map(Palette::reversed)
    }

    fn named_color(&self, name: &str) -> Option<Rgba> {
        let name = name.to_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, (r, g, b))| Rgba::opaque(*r as f64 / 255.0, *g as f64 / 255.0, *b as f64 / 255.0))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.palettes.keys().cloned().collect();
        names.sort();
        names
    }
}

fn stops(hex: &[&str]) -> Palette {
    Palette::new(
        hex.iter()
            .map(|h| Rgba::from_hex(h).expect("builtin palette stop"))
            .collect(),
    )
}

const BUILTIN_PALETTES: &[(&str, &[&str])] = &[
    (
        "viridis",
        &[
            "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779",
            "#6ece58", "#b5de2b", "#fde725",
        ],
    ),
    (
        "magma",
        &[
            "#000004", "#180f3d", "#440f76", "#721f81", "#9e2f7f", "#cd4071", "#f1605d",
            "#fd9668", "#feca8d", "#fcfdbf",
        ],
    ),
    (
        "inferno",
        &[
            "#000004", "#1b0c41", "#4a0c6b", "#781c6d", "#a52c60", "#cf4446", "#ed6925",
            "#fb9b06", "#f7d03c", "#fcffa4",
        ],
    ),
    (
        "plasma",
        &[
            "#0d0887", "#46039f", "#7201a8", "#9c179e", "#bd3786", "#d8576b", "#ed7953",
            "#fb9f3a", "#fdca26", "#f0f921",
        ],
    ),
    ("gray", &["#000000", "#ffffff"]),
    (
        "Blues",
        &[
            "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5",
            "#08519c", "#08306b",
        ],
    ),
    (
        "Greens",
        &[
            "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45",
            "#006d2c", "#00441b",
        ],
    ),
    (
        "YlOrRd",
        &[
            "#ffffcc", "#ffeda0", "#fed976", "#feb24c", "#fd8d3c", "#fc4e2a", "#e31a1c",
            "#bd0026", "#800026",
        ],
    ),
    (
        "RdBu",
        &[
            "#67001f", "#b2182b", "#d6604d", "#f4a582", "#fddbc7", "#f7f7f7", "#d1e5f0",
            "#92c5de", "#4393c3", "#2166ac", "#053061",
        ],
    ),
    (
        "BrBG",
        &[
            "#543005", "#8c510a", "#bf812d", "#dfc27d", "#f6e8c3", "#f5f5f5", "#c7eae5",
            "#80cdc1", "#35978f", "#01665e", "#003c30",
        ],
    ),
    (
        "Spectral",
        &[
            "#9e0142", "#d53e4f", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#e6f598",
            "#abdda4", "#66c2a5", "#3288bd", "#5e4fa2",
        ],
    ),
    (
        "tab10",
        &[
            "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2",
            "#7f7f7f", "#bcbd22", "#17becf",
        ],
    ),
];

const NAMED_COLORS: &[(&str, (u8, u8, u8))] = &[
    ("black", (0, 0, 0)),
    ("white", (255, 255, 255)),
    ("red", (255, 0, 0)),
    ("green", (0, 128, 0)),
    ("blue", (0, 0, 255)),
    ("cyan", (0, 255, 255)),
    ("magenta", (255, 0, 255)),
    ("yellow", (255, 255, 0)),
    ("orange", (255, 165, 0)),
    ("purple", (128, 0, 128)),
    ("brown", (165, 42, 42)),
    ("pink", (255, 192, 203)),
    ("gray", (128, 128, 128)),
    ("grey", (128, 128, 128)),
    ("lightgray", (211, 211, 211)),
    ("lightgrey", (211, 211, 211)),
    ("darkgray", (169, 169, 169)),
    ("darkgrey", (169, 169, 169)),
    ("darkred", (139, 0, 0)),
    ("darkgreen", (0, 100, 0)),
    ("darkblue", (0, 0, 139)),
    ("navy", (0, 0, 128)),
    ("teal", (0, 128, 128)),
    ("olive", (128, 128, 0)),
    ("gold", (255, 215, 0)),
    ("silver", (192, 192, 192)),
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sample_endpoints() {
        let table = PaletteTable::builtin();
        let gray = table.lookup("gray").unwrap();
        assert_eq!(gray.sample(0.0).to_hex(), "#000000");
        assert_eq!(gray.sample(1.0).to_hex(), "#ffffff");
    }

    #[test]
    fn test_sample_n_spans_range() {
        let table = PaletteTable::builtin();
        let gray = table.lookup("gray").unwrap();
        let colors = gray.sample_n(3);
        assert_eq!(colors.len(), 3);
        assert_eq!(colors[0].to_hex(), "#000000");
        assert_eq!(colors[2].to_hex(), "#ffffff");
        assert!((colors[1].r - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_reversed_suffix_lookup() {
        let table = PaletteTable::builtin();
        let forward = table.lookup("viridis").unwrap();
        let reversed = table.lookup("viridis_r").unwrap();
        assert_eq!(forward.sample(0.0), reversed.sample(1.0));
        assert_eq!(forward.sample(1.0), reversed.sample(0.0));
    }

    #[test]
    fn test_unknown_palette_is_none() {
        let table = PaletteTable::builtin();
        assert!(table.lookup("rainbow_road").is_none());
        assert!(table.lookup("rainbow_road_r").is_none());
    }

    #[test]
    fn test_named_color_case_insensitive() {
        let table = PaletteTable::builtin();
        assert!(table.named_color("Gray").is_some());
        assert!(table.named_color("vantablack").is_none());
    }

    #[test]
    fn test_user_palette_yaml() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("palettes.yaml");
        std::fs::write(&path, "ocean:\n  colors: [\"#000033\", \"#0066cc\", \"#e0ffff\"]\n")
            .unwrap();
        let mut table = PaletteTable::builtin();
        table.load_yaml_file(&path).unwrap();
        let ocean = table.lookup("ocean").unwrap();
        assert_eq!(ocean.stops().len(), 3);
        // `_r` works for user palettes too
        assert!(table.lookup("ocean_r").is_some());
    }

    #[test]
    fn test_user_palette_bad_hex_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("palettes.yaml");
        std::fs::write(&path, "ocean:\n  colors: [\"#nothex\", \"#0066cc\"]\n").unwrap();
        let mut table = PaletteTable::builtin();
        assert!(matches!(
            table.load_yaml_file(&path),
            Err(ConfigError::Load { .. })
        ));
    }

    #[test]
    fn test_cpt_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("relief.cpt");
        std::fs::write(
            &path,
            "# test palette\n0 0 0 0 1 128 128 128\n1 128 128 128 2 255 255 255\nB 0 0 0\nF 255 255 255\nN 128 128 128\n",
        )
        .unwrap();
        let mut table = PaletteTable::empty();
        table.load_cpt_file(&path).unwrap();
        let relief = table.lookup("relief").unwrap();
        assert_eq!(relief.stops().len(), 3);
        assert_eq!(relief.sample(0.0).to_hex(), "#000000");
        assert_eq!(relief.sample(1.0).to_hex(), "#ffffff");
    }
}
