//! Turn resolved settings into concrete color-mapping and normalization
//! objects.
//!
//! This is the only stage that depends on the external palette vocabulary:
//! unknown palette or color names surface as [`ConfigError::Build`], distinct
//! from schema errors, because the declared schema was fine.

use crate::color::{ColorValue, Rgba};
use crate::error::{ConfigError, ConfigResult};
use crate::palette::{Palette, PaletteProvider};
use crate::settings::{CbarSettings, CmapSettings, ColorbarConfig, Extend, NormSettings};

/// Discretization count used for each component of a multi-palette colormap
/// when the record does not specify one.
const DEFAULT_COMPONENT_N: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum ColormapColors {
    /// Interpolating map over a single base palette.
    Continuous(Palette),
    /// Fixed color list (discretized or concatenated components).
    Discrete(Vec<Rgba>),
}

/// A concrete color mapping with bad/over/under decorations applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    colors: ColormapColors,
    bad: Rgba,
    over: Option<Rgba>,
    under: Option<Rgba>,
}

impl Colormap {
    /// Number of discrete colors, or `None` for a continuous map.
    pub fn n_colors(&self) -> Option<usize> {
        match &self.colors {
            ColormapColors::Continuous(_) => None,
            ColormapColors::Discrete(colors) => Some(colors.len()),
        }
    }

    /// The discrete color list, if any.
    pub fn colors(&self) -> Option<&[Rgba]> {
        match &self.colors {
            ColormapColors::Continuous(_) => None,
            ColormapColors::Discrete(colors) => Some(colors),
        }
    }

    /// Map a normalized value to a color. NaN is missing data; values
    /// outside `[0, 1]` take the extension color when one is set, the
    /// endpoint color otherwise.
    pub fn color_at(&self, t: f64) -> Rgba {
        if t.is_nan() {
            return self.bad;
        }
        if t < 0.0 {
            if let Some(under) = self.under {
                return under;
            }
            return self.endpoint(0.0);
        }
        if t > 1.0 {
            if let Some(over) = self.over {
                return over;
            }
            return self.endpoint(1.0);
        }
        self.endpoint(t)
    }

    fn endpoint(&self, t: f64) -> Rgba {
        match &self.colors {
            ColormapColors::Continuous(palette) => palette.sample(t),
            ColormapColors::Discrete(colors) => {
                let n = colors.len();
                let idx = ((t * n as f64).floor() as usize).min(n - 1);
                colors[idx]
            }
        }
    }

    pub fn bad(&self) -> Rgba {
        self.bad
    }

    /// Extension color above the range; `None` means "do not render one".
    pub fn over(&self) -> Option<Rgba> {
        self.over
    }

    /// Extension color below the range; `None` means "do not render one".
    pub fn under(&self) -> Option<Rgba> {
        self.under
    }
}

/// Build the concrete colormap for a resolved `cmap` block.
///
/// A single name with no count gives a continuous map; a count samples the
/// base palette evenly; multiple names sample each component at its paired
/// count and concatenate in list order (total length = sum of counts).
pub fn build_colormap(
    settings: &CmapSettings,
    provider: &dyn PaletteProvider,
) -> ConfigResult<Colormap> {
    let palettes: Vec<Palette> = settings
        .name
        .iter()
        .map(|name| {
            provider
                .lookup(name)
                .ok_or_else(|| ConfigError::build("colormap", name, "unknown palette name"))
        })
        .collect::<ConfigResult<_>>()?;

    let colors = if palettes.len() == 1 {
        match settings.n.as_ref().and_then(|ns| ns.first()) {
            None => ColormapColors::Continuous(palettes[0].clone()),
            Some(&count) => ColormapColors::Discrete(palettes[0].sample_n(count)),
        }
    } else {
        let counts: Vec<usize> = match &settings.n {
            Some(ns) => ns.clone(),
            None => vec![DEFAULT_COMPONENT_N; palettes.len()],
        };
        let mut combined = Vec::with_capacity(counts.iter().sum());
        for (palette, count) in palettes.iter().zip(&counts) {
            combined.extend(palette.sample_n(*count));
        }
        ColormapColors::Discrete(combined)
    };

    let bad = match resolve_color(settings.bad_color.as_ref(), provider)? {
        Some(c) => c,
        None => Rgba::TRANSPARENT,
    };
    let bad = match settings.bad_alpha {
        Some(alpha) => bad.with_alpha(alpha),
        None => bad,
    };
    let over = resolve_color(settings.over_color.as_ref(), provider)?;
    let under = resolve_color(settings.under_color.as_ref(), provider)?;

    Ok(Colormap {
        colors,
        bad,
        over,
        under,
    })
}

/// `None` both for an absent slot and for the literal `none` ("do not
/// render an extension color").
fn resolve_color(
    value: Option<&ColorValue>,
    provider: &dyn PaletteProvider,
) -> ConfigResult<Option<Rgba>> {
    match value {
        None | Some(ColorValue::None) => Ok(None),
        Some(ColorValue::Rgba(c)) => Ok(Some(*c)),
        Some(ColorValue::Named(name)) => provider
            .named_color(name)
            .map(Some)
            .ok_or_else(|| ConfigError::build("color", name, "unknown color name")),
    }
}

/// A concrete normalization transform.
///
/// `normalize` maps in-range values into `[0, 1]`; out-of-range values land
/// below 0 or above 1 so the colormap's under/over machinery engages, and
/// NaN propagates (missing data). With `clip` set, finite results are
/// clamped into `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalizer {
    Linear {
        vmin: Option<f64>,
        vmax: Option<f64>,
        clip: bool,
    },
    /// Identity: data already holds color indices in `[0, 1]`.
    Identity,
    Boundary {
        boundaries: Vec<f64>,
        /// Total color slots, extension sides included.
        ncolors: usize,
        clip: bool,
        /// Active extension sides; each reserves a dedicated color slot
        /// (the first slot for `min`, the last for `max`).
        extend: Extend,
    },
    Category {
        codes: Vec<i64>,
        labels: Vec<String>,
    },
    TwoSlope {
        vcenter: f64,
        vmin: Option<f64>,
        vmax: Option<f64>,
    },
    Centered {
        vcenter: f64,
        halfrange: Option<f64>,
        clip: bool,
    },
    Log {
        vmin: Option<f64>,
        vmax: Option<f64>,
        clip: bool,
    },
    SymLog {
        linthresh: f64,
        linscale: f64,
        base: f64,
        vmin: Option<f64>,
        vmax: Option<f64>,
        clip: bool,
    },
    Power {
        gamma: f64,
        vmin: Option<f64>,
        vmax: Option<f64>,
        clip: bool,
    },
    Asinh {
        linear_width: f64,
        vmin: Option<f64>,
        vmax: Option<f64>,
        clip: bool,
    },
}

/// Instantiate the transform for a resolved `norm` block.
pub fn build_norm(settings: &NormSettings) -> Normalizer {
    match settings {
        NormSettings::Norm { vmin, vmax, clip } => Normalizer::Linear {
            vmin: *vmin,
            vmax: *vmax,
            clip: *clip,
        },
        NormSettings::NoNorm { .. } => Normalizer::Identity,
        NormSettings::BoundaryNorm {
            boundaries,
            ncolors,
            clip,
            extend,
        } => Normalizer::Boundary {
            ncolors: ncolors
                .unwrap_or(boundaries.len().saturating_sub(1) + extend.extra_sides())
                .max(1),
            boundaries: boundaries.clone(),
            clip: *clip,
            extend: *extend,
        },
        NormSettings::CategoryNorm { categories } => Normalizer::Category {
            codes: categories.iter().map(|(c, _)| *c).collect(),
            labels: categories.iter().map(|(_, l)| l.clone()).collect(),
        },
        NormSettings::TwoSlopeNorm {
            vcenter,
            vmin,
            vmax,
        } => Normalizer::TwoSlope {
            vcenter: *vcenter,
            vmin: *vmin,
            vmax: *vmax,
        },
        NormSettings::CenteredNorm {
            vcenter,
            halfrange,
            clip,
        } => Normalizer::Centered {
            vcenter: *vcenter,
            halfrange: *halfrange,
            clip: *clip,
        },
        NormSettings::LogNorm { vmin, vmax, clip } => Normalizer::Log {
            vmin: *vmin,
            vmax: *vmax,
            clip: *clip,
        },
        NormSettings::SymLogNorm {
            linthresh,
            linscale,
            base,
            vmin,
            vmax,
            clip,
        } => Normalizer::SymLog {
            linthresh: *linthresh,
            linscale: *linscale,
            base: *base,
            vmin: *vmin,
            vmax: *vmax,
            clip: *clip,
        },
        NormSettings::PowerNorm {
            gamma,
            vmin,
            vmax,
            clip,
        } => Normalizer::Power {
            gamma: *gamma,
            vmin: *vmin,
            vmax: *vmax,
            clip: *clip,
        },
        NormSettings::AsinhNorm {
            linear_width,
            vmin,
            vmax,
            clip,
        } => Normalizer::Asinh {
            linear_width: linear_width.unwrap_or(1.0),
            vmin: *vmin,
            vmax: *vmax,
            clip: *clip,
        },
    }
}

impl Normalizer {
    /// Map a data value into colormap space. See the type docs for the
    /// range contract.
    pub fn normalize(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        let (value, clip) = match self {
            Normalizer::Linear { vmin, vmax, clip } => {
                let (lo, hi) = range(*vmin, *vmax, 0.0, 1.0);
                ((x - lo) / (hi - lo), *clip)
            }
            Normalizer::Identity => (x, false),
            Normalizer::Boundary {
                boundaries,
                ncolors,
                clip,
                extend,
            } => {
                if boundaries.len() < 2 {
                    return f64::NAN;
                }
                let first = boundaries[0];
                let last = boundaries[boundaries.len() - 1];
                if x < first {
                    (-0.5, *clip)
                } else if x > last {
                    (1.5, *clip)
                } else {
                    // the last boundary falls into the last bin
                    let n_bins = boundaries.len() - 1;
                    let mut bin = n_bins - 1;
                    for (i, pair) in boundaries.windows(2).enumerate() {
                        if x >= pair[0] && x < pair[1] {
                            bin = i;
                            break;
                        }
                    }
                    // an active min side owns the first color slot, so
                    // in-range bins start one slot up
                    let slot = bin + extend.extends_min() as usize;
                    ((slot as f64 + 0.5) / *ncolors as f64, *clip)
                }
            }
            Normalizer::Category { codes, .. } => {
                let code = x.round() as i64;
                match codes.iter().position(|c| *c == code) {
                    Some(i) => ((i as f64 + 0.5) / codes.len() as f64, false),
                    // an unknown code is missing data
                    None => (f64::NAN, false),
                }
            }
            Normalizer::TwoSlope {
                vcenter,
                vmin,
                vmax,
            } => {
                let lo = vmin.unwrap_or(vcenter - 1.0);
                let hi = vmax.unwrap_or(vcenter + 1.0);
                let value = if x <= *vcenter {
                    0.5 * (x - lo) / (vcenter - lo)
                } else {
                    0.5 + 0.5 * (x - vcenter) / (hi - vcenter)
                };
                (value, false)
            }
            Normalizer::Centered {
                vcenter,
                halfrange,
                clip,
            } => {
                let h = halfrange.unwrap_or(1.0);
                ((x - (vcenter - h)) / (2.0 * h), *clip)
            }
            Normalizer::Log { vmin, vmax, clip } => {
                if x <= 0.0 {
                    return f64::NAN;
                }
                let (lo, hi) = range(*vmin, *vmax, 1.0, 10.0);
                ((x.ln() - lo.ln()) / (hi.ln() - lo.ln()), *clip)
            }
            Normalizer::SymLog {
                vmin, vmax, clip, ..
            } => {
                let (lo, hi) = range(*vmin, *vmax, -1.0, 1.0);
                let (t_lo, t_hi) = (self.symlog_transform(lo), self.symlog_transform(hi));
                ((self.symlog_transform(x) - t_lo) / (t_hi - t_lo), *clip)
            }
            Normalizer::Power {
                gamma, vmin, vmax, clip,
            } => {
                let (lo, hi) = range(*vmin, *vmax, 0.0, 1.0);
                let t = (x - lo) / (hi - lo);
                let value = if t < 0.0 { t } else { t.powf(*gamma) };
                (value, *clip)
            }
            Normalizer::Asinh {
                linear_width,
                vmin,
                vmax,
                clip,
            } => {
                let (lo, hi) = range(*vmin, *vmax, -1.0, 1.0);
                let t = |v: f64| (v / linear_width).asinh();
                ((t(x) - t(lo)) / (t(hi) - t(lo)), *clip)
            }
        };
        if clip && value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            value
        }
    }

    // matplotlib's symmetric log transform with linscale adjustment
    fn symlog_transform(&self, x: f64) -> f64 {
        let Normalizer::SymLog {
            linthresh,
            linscale,
            base,
            ..
        } = self
        else {
            return x;
        };
        let adj = linscale / (1.0 - base.recip());
        if x.abs() <= *linthresh {
            x * adj
        } else {
            x.signum() * linthresh * (adj + (x.abs() / linthresh).log(*base))
        }
    }

    /// Adopt a data range for any bound not fixed by the record.
    pub fn autoscale(&mut self, data_min: f64, data_max: f64) {
        match self {
            Normalizer::Linear { vmin, vmax, .. }
            | Normalizer::TwoSlope { vmin, vmax, .. }
            | Normalizer::Log { vmin, vmax, .. }
            | Normalizer::SymLog { vmin, vmax, .. }
            | Normalizer::Power { vmin, vmax, .. }
            | Normalizer::Asinh { vmin, vmax, .. } => {
                vmin.get_or_insert(data_min);
                vmax.get_or_insert(data_max);
            }
            Normalizer::Centered {
                vcenter, halfrange, ..
            } => {
                if halfrange.is_none() {
                    let h = (data_min - *vcenter).abs().max((data_max - *vcenter).abs());
                    *halfrange = Some(h);
                }
            }
            Normalizer::Identity | Normalizer::Boundary { .. } | Normalizer::Category { .. } => {}
        }
    }

    /// Tick positions for the renderer: bin edges for a boundary norm,
    /// category midpoints for a category norm.
    pub fn ticks(&self) -> Option<Vec<f64>> {
        match self {
            Normalizer::Boundary { boundaries, .. } => Some(boundaries.clone()),
            Normalizer::Category { codes, .. } => {
                // midpoint between each code and the next edge (last edge is
                // last code + 1), mirroring the stepped color bands
                let mut edges: Vec<f64> = codes.iter().map(|c| *c as f64).collect();
                edges.push(codes[codes.len() - 1] as f64 + 1.0);
                Some(
                    edges
                        .windows(2)
                        .map(|pair| (pair[0] + pair[1]) / 2.0)
                        .collect(),
                )
            }
            _ => None,
        }
    }

    /// Tick labels for a category norm.
    pub fn tick_labels(&self) -> Option<Vec<String>> {
        match self {
            Normalizer::Category { labels, .. } => Some(labels.clone()),
            _ => None,
        }
    }
}

fn range(vmin: Option<f64>, vmax: Option<f64>, default_min: f64, default_max: f64) -> (f64, f64) {
    (vmin.unwrap_or(default_min), vmax.unwrap_or(default_max))
}

/// The full directive bundle an external renderer consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltColorbar {
    pub cmap: Colormap,
    pub norm: Normalizer,
    pub cbar: CbarSettings,
}

/// Build everything a renderer needs from one resolved record.
pub fn build(config: &ColorbarConfig, provider: &dyn PaletteProvider) -> ConfigResult<BuiltColorbar> {
    Ok(BuiltColorbar {
        cmap: build_colormap(&config.cmap, provider)?,
        norm: build_norm(&config.norm),
        cbar: config.cbar.clone(),
    })
}
