use serde::{Deserialize, Serialize};

use crate::color::{ColorInput, Rgba};
use crate::error::{Error, Result};
use crate::projection::{ProjectOn, Rescale};

/// Display settings of a source set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Marker radius for the lowest data value.
    pub radius_min: f32,
    /// Marker radius for the highest data value.
    pub radius_max: f32,
    /// Shrink markers so they scale with the camera zoom.
    pub scaling: bool,
    pub opacity: f32,
    pub color: ColorInput,
    /// Color of excluded sources.
    pub mask_color: String,
    pub project_on: ProjectOn,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            radius_min: 5.0,
            radius_max: 10.0,
            scaling: false,
            opacity: 1.0,
            color: ColorInput::default(),
            mask_color: "gray".to_string(),
            project_on: ProjectOn::Modulation,
        }
    }
}

impl SourceConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.radius_min.is_finite() || !self.radius_max.is_finite() {
            return Err(Error::NonFinite("marker radius"));
        }
        if self.radius_min >= self.radius_max {
            return Err(Error::RadiusRange {
                min: self.radius_min,
                max: self.radius_max,
            });
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(Error::Opacity(self.opacity));
        }
        self.mask_rgba()?;
        Ok(())
    }

    /// Parsed color of excluded sources.
    pub fn mask_rgba(&self) -> Result<Rgba> {
        Rgba::parse(&self.mask_color)
    }
}

/// Parameters of a projection call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Distance beyond which a source does not reach a face corner.
    pub radius: f32,
    /// Let sources reach corners of the opposite hemisphere.
    pub contribute: bool,
    pub rescale: Rescale,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            radius: 10.0,
            contribute: false,
            rescale: Rescale::CoveredData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_validate() {
        assert!(SourceConfig::default().validate().is_ok());
        let bad = SourceConfig {
            radius_min: 10.0,
            radius_max: 10.0,
            ..Default::default()
        };
        assert_eq!(
            bad.validate().unwrap_err(),
            Error::RadiusRange {
                min: 10.0,
                max: 10.0
            }
        );
    }

    #[test]
    fn test_mask_color_and_opacity_checked() {
        let cfg = SourceConfig::default();
        assert_eq!(cfg.mask_rgba().unwrap(), Rgba::parse("gray").unwrap());
        let bad_mask = SourceConfig {
            mask_color: "not-a-color".into(),
            ..Default::default()
        };
        assert!(bad_mask.validate().unwrap_err().is_configuration());
        let bad_opacity = SourceConfig {
            opacity: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(bad_opacity.validate().unwrap_err(), Error::Opacity(_)));
    }

    #[test]
    fn test_config_json_defaults() {
        let cfg: ProjectionConfig = serde_json::from_str(r#"{"radius": 4.0}"#).unwrap();
        assert_eq!(cfg.radius, 4.0);
        assert!(!cfg.contribute);
        assert_eq!(cfg.rescale, Rescale::CoveredData);

        let src: SourceConfig = serde_json::from_str(r#"{"scaling": true}"#).unwrap();
        assert!(src.scaling);
        assert_eq!(src.radius_min, 5.0);
    }

    #[test]
    fn test_config_round_trip() {
        let cfg = SourceConfig {
            color: ColorInput::List(vec!["red".into(), "#00ff00".into()]),
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SourceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
