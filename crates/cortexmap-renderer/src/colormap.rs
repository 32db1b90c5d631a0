//! Colormap lookup tables for overlay slots.
//!
//! Turning values into colors is delegated to a [`Colormap`] implementation;
//! this module only samples the overlay range and keeps the table size.

use serde::{Deserialize, Serialize};

use cortexmap_core::error::{Error, Result};
use cortexmap_core::{Rgba, ValueRange};

/// Number of entries in every overlay lookup table.
pub const LUT_LEN: usize = 1024;

/// Colormap settings of one overlay slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColormapParams {
    /// Colormap name, optionally suffixed with `_r` for the reversed map.
    pub cmap: String,
    /// Values mapped onto the two ends of the colormap. Defaults to the
    /// overlay data range.
    pub clim: Option<ValueRange>,
    /// Values below `vmin` are painted with `under` (when set).
    pub vmin: Option<f32>,
    /// Values above `vmax` are painted with `over` (when set).
    pub vmax: Option<f32>,
    pub under: Option<Rgba>,
    pub over: Option<Rgba>,
}

impl Default for ColormapParams {
    fn default() -> Self {
        Self {
            cmap: "viridis".to_string(),
            clim: None,
            vmin: None,
            vmax: None,
            under: None,
            over: None,
        }
    }
}

impl ColormapParams {
    pub fn named(cmap: &str) -> Self {
        Self {
            cmap: cmap.to_string(),
            ..Default::default()
        }
    }
}

/// Maps values to colors.
///
/// Must return exactly one color per input value.
pub trait Colormap {
    fn to_rgba(&self, values: &[f32], data_range: ValueRange, params: &ColormapParams) -> Result<Vec<Rgba>>;
}

/// Sample `LUT_LEN` evenly spaced values across `range` through `colormap`.
pub fn build_lut(colormap: &dyn Colormap, range: ValueRange, params: &ColormapParams) -> Result<Vec<Rgba>> {
    let samples = range.linspace(LUT_LEN);
    let lut = colormap.to_rgba(&samples, range, params)?;
    if lut.len() != LUT_LEN {
        return Err(Error::LengthMismatch {
            what: "colormap output",
            expected: LUT_LEN,
            found: lut.len(),
        });
    }
    Ok(lut)
}

/// Color of a normalized coordinate in `[0, 1]` (nearest entry).
///
/// Rounds as `floor(x + 0.5)`, the same texel the vertex shader loads.
pub fn lut_lookup(lut: &[Rgba], coord: f32) -> Rgba {
    let last = lut.len().saturating_sub(1);
    let i = (coord.clamp(0.0, 1.0) * last as f32 + 0.5).floor() as usize;
    lut[i.min(last)]
}

/// Analytic approximations of a few common scientific colormaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinColormap;

impl BuiltinColormap {
    pub const NAMES: &'static [&'static str] = &["viridis", "inferno", "plasma", "coolwarm", "gray", "hot"];

    fn sample(name: &str, t: f32) -> Option<Rgba> {
        let t = t.clamp(0.0, 1.0);
        let (r, g, b) = match name {
            "viridis" => (
                0.267 + t * (-0.075 + t * 0.801),
                0.005 + t * (1.402 - t * 0.501),
                0.329 + t * (0.852 - t * 1.037),
            ),
            "inferno" => (
                0.001 + t * (1.908 - t * 0.920),
                t * t * 0.985,
                0.014 + t * (1.562 - t * 1.939) + t * t * t * 1.008,
            ),
            "plasma" => (
                0.050 + t * (1.577 - t * 0.687),
                0.030 + t * t * 0.940,
                0.528 + t * (0.462 - t * 0.860),
            ),
            "coolwarm" => {
                if t < 0.5 {
                    let s = t * 2.0;
                    (0.231 + s * 0.769, 0.298 + s * 0.702, 0.753 + s * 0.247)
                } else {
                    let s = (t - 0.5) * 2.0;
                    (1.0 - s * 0.294, 1.0 - s * 0.984, 1.0 - s * 0.850)
                }
            }
            "gray" | "grey" => (t, t, t),
            "hot" => (
                (t * 3.0).min(1.0),
                (t * 3.0 - 1.0).clamp(0.0, 1.0),
                (t * 3.0 - 2.0).clamp(0.0, 1.0),
            ),
            _ => return None,
        };
        Some(Rgba::new(
            r.clamp(0.0, 1.0),
            g.clamp(0.0, 1.0),
            b.clamp(0.0, 1.0),
            1.0,
        ))
    }
}

impl Colormap for BuiltinColormap {
    fn to_rgba(&self, values: &[f32], data_range: ValueRange, params: &ColormapParams) -> Result<Vec<Rgba>> {
        let (name, reversed) = match params.cmap.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (params.cmap.as_str(), false),
        };
        if Self::sample(name, 0.0).is_none() {
            return Err(Error::UnknownColormap(params.cmap.clone()));
        }
        let clim = params.clim.unwrap_or(data_range);

        Ok(values
            .iter()
            .map(|&v| {
                if let (Some(vmin), Some(under)) = (params.vmin, params.under) {
                    if v < vmin {
                        return under;
                    }
                }
                if let (Some(vmax), Some(over)) = (params.vmax, params.over) {
                    if v > vmax {
                        return over;
                    }
                }
                let t = if clim.is_degenerate() {
                    0.5
                } else {
                    clim.normalize(v)
                };
                let t = if reversed { 1.0 - t } else { t };
                // Name validity was checked above.
                Self::sample(name, t).unwrap_or(Rgba::BLACK)
            })
            .collect())
    }
}
