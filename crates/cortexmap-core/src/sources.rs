use serde::Serialize;

use crate::color::{ColorInput, Rgba};
use crate::config::SourceConfig;
use crate::error::{check_len, Error, Result};
use crate::geometry::Vec3;
use crate::range::ValueRange;

/// Marker size multiplier applied to the configured radii.
const RADIUS_FACTOR: f32 = 1.5;
/// Divisor applied to marker radii when scaling with the camera.
const SCALING_DIVISOR: f32 = 3.0;

/// Point sources (e.g. intracranial electrodes) with one scalar each.
///
/// Positions, data and mask always have the same length. A `true` mask entry
/// excludes the point from projection and displays it with the mask color.
/// The set is never resized: a different number of points means a new set.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSet {
    xyz: Vec<Vec3>,
    data: Vec<f32>,
    mask: Vec<bool>,
    colors: Option<Vec<Rgba>>,
    labels: Option<Vec<String>>,
}

/// A subset of a [`SourceSet`], e.g. only its active points.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSubset {
    /// Indices into the parent set.
    pub indices: Vec<usize>,
    pub positions: Vec<Vec3>,
    pub data: Vec<f32>,
}

impl SourceSubset {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl SourceSet {
    /// Build a source set. Missing data defaults to ones, a missing mask to
    /// all-false.
    pub fn new(xyz: Vec<Vec3>, data: Option<Vec<f32>>, mask: Option<Vec<bool>>) -> Result<Self> {
        let n = xyz.len();
        if !xyz.iter().all(Vec3::is_finite) {
            return Err(Error::NonFinite("source coordinates"));
        }
        let data = data.unwrap_or_else(|| vec![1.0; n]);
        check_len("source data", n, data.len())?;
        if !data.iter().all(|v| v.is_finite()) {
            return Err(Error::NonFinite("source data"));
        }
        let mask = mask.unwrap_or_else(|| vec![false; n]);
        check_len("source mask", n, mask.len())?;
        Ok(Self {
            xyz,
            data,
            mask,
            colors: None,
            labels: None,
        })
    }

    /// Resolve the display color of every point.
    pub fn with_color(mut self, color: &ColorInput, opacity: f32) -> Result<Self> {
        self.colors = Some(color.resolve(self.len(), opacity)?);
        Ok(self)
    }

    /// Apply the display settings of `config`: validated radii, and colors
    /// resolved at the configured opacity.
    pub fn with_config(self, config: &SourceConfig) -> Result<Self> {
        config.validate()?;
        self.with_color(&config.color, config.opacity)
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self> {
        check_len("source labels", self.len(), labels.len())?;
        self.labels = Some(labels);
        Ok(self)
    }

    /// Total number of points, excluded ones included.
    pub fn len(&self) -> usize {
        self.xyz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xyz.is_empty()
    }

    /// Number of points taking part in projection.
    pub fn active_count(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }

    pub fn has_excluded(&self) -> bool {
        self.mask.iter().any(|m| *m)
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.xyz
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn set_mask(&mut self, mask: Vec<bool>) -> Result<()> {
        check_len("source mask", self.len(), mask.len())?;
        self.mask = mask;
        Ok(())
    }

    /// Set every mask entry to `value`.
    pub fn reset_mask(&mut self, value: bool) {
        self.mask.iter_mut().for_each(|m| *m = value);
    }

    /// Points that take part in projection.
    pub fn active(&self) -> SourceSubset {
        self.select(false)
    }

    /// Points excluded from projection.
    pub fn excluded(&self) -> SourceSubset {
        self.select(true)
    }

    fn select(&self, masked: bool) -> SourceSubset {
        let indices: Vec<usize> = (0..self.len()).filter(|&i| self.mask[i] == masked).collect();
        SourceSubset {
            positions: indices.iter().map(|&i| self.xyz[i]).collect(),
            data: indices.iter().map(|&i| self.data[i]).collect(),
            indices,
        }
    }

    /// Marker radius of every point, modulated by its data value.
    ///
    /// Constant data falls back to the minimum radius for every point.
    pub fn marker_radii(&self, config: &SourceConfig) -> Result<Vec<f32>> {
        config.validate()?;
        let lo = RADIUS_FACTOR * config.radius_min;
        let hi = RADIUS_FACTOR * config.radius_max;
        let mut radii = match ValueRange::from_values(&self.data) {
            Some(range) if !range.is_degenerate() => {
                let target = ValueRange::new(lo, hi);
                self.data.iter().map(|&v| range.rescale(v, &target)).collect()
            }
            _ => vec![lo; self.len()],
        };
        if config.scaling {
            radii.iter_mut().for_each(|r| *r /= SCALING_DIVISOR);
        }
        Ok(radii)
    }

    /// Per-point display color; excluded points take `mask_color`.
    pub fn display_colors(&self, mask_color: Rgba) -> Result<Vec<Rgba>> {
        let base = match &self.colors {
            Some(colors) => colors.clone(),
            None => ColorInput::default().resolve(self.len(), 1.0)?,
        };
        Ok(base
            .into_iter()
            .zip(&self.mask)
            .map(|(c, &masked)| if masked { mask_color } else { c })
            .collect())
    }

    /// Labels with excluded points blanked out.
    pub fn visible_labels(&self) -> Option<Vec<String>> {
        self.labels.as_ref().map(|labels| {
            labels
                .iter()
                .zip(&self.mask)
                .map(|(l, &masked)| if masked { String::new() } else { l.clone() })
                .collect()
        })
    }
}
