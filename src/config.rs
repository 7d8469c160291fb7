use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extrude::ExtrusionProfile;

/// Default largest planar side of the normalized model.
pub const DEFAULT_TARGET_SIZE: f64 = 60.0;

/// User-facing conversion settings, as read from a JSON config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ConversionConfig {
    pub depth: f64,
    pub bevel_enabled: bool,
    pub bevel_thickness: f64,
    pub bevel_size: f64,
    pub bevel_segments: u32,
    pub target_size: f64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        let profile = ExtrusionProfile::default();
        Self {
            depth: profile.depth,
            bevel_enabled: profile.bevel_enabled,
            bevel_thickness: profile.bevel_thickness,
            bevel_size: profile.bevel_size,
            bevel_segments: profile.bevel_segments,
            target_size: DEFAULT_TARGET_SIZE,
        }
    }
}

impl ConversionConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
            field: "config",
            reason: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::source_load(path.display().to_string(), e))?;
        Self::from_json(&text)
    }

    /// Check ranges. Bevel sizes that are negative or not finite become 0.
    pub fn validate(mut self) -> Result<Self> {
        positive("depth", self.depth)?;
        positive("targetSize", self.target_size)?;
        for value in [&mut self.bevel_thickness, &mut self.bevel_size] {
            if !value.is_finite() || *value < 0.0 {
                *value = 0.0;
            }
        }
        Ok(self)
    }

    pub fn profile(&self) -> ExtrusionProfile {
        ExtrusionProfile {
            depth: self.depth,
            bevel_enabled: self.bevel_enabled,
            bevel_thickness: self.bevel_thickness,
            bevel_size: self.bevel_size,
            bevel_segments: self.bevel_segments,
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            reason: format!("must be a positive number, got {}", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConversionConfig::from_json("{}").unwrap();
        assert_eq!(config, ConversionConfig::default());
        assert_eq!(config.depth, 40.0);
        assert_eq!(config.bevel_segments, 5);
        assert_eq!(config.target_size, 60.0);
    }

    #[test]
    fn test_partial_override() {
        let config =
            ConversionConfig::from_json(r#"{"depth": 2, "bevelEnabled": false}"#).unwrap();
        assert_eq!(config.depth, 2.0);
        assert!(!config.bevel_enabled);
        assert_eq!(config.bevel_size, 2.0);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ConversionConfig::from_json(r#"{"curveSegments": 12}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { field: "config", .. }));
    }

    #[test]
    fn test_validate() {
        let config = ConversionConfig {
            bevel_size: -3.0,
            bevel_thickness: f64::NAN,
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(config.bevel_size, 0.0);
        assert_eq!(config.bevel_thickness, 0.0);

        let bad = ConversionConfig {
            depth: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(Error::InvalidConfig { field: "depth", .. })
        ));

        let bad = ConversionConfig {
            target_size: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(Error::InvalidConfig { field: "targetSize", .. })
        ));
    }

    #[test]
    fn test_profile() {
        let profile = ConversionConfig::default().profile();
        assert_eq!(profile, ExtrusionProfile::default());
    }
}
