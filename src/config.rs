//! Engine configuration
//!
//! Session timing and cadence. Detection thresholds and aggregation minima are
//! fixed constants in their own modules and are not configurable.

use serde::{Deserialize, Serialize};

use crate::baseline::DEFAULT_CALIBRATION_SECS;
use crate::commentary::DEFAULT_MAX_COMMENTARY;
use crate::detector::REFERENCE_FPS;
use crate::error::AnalysisError;

/// Default question window in seconds
pub const DEFAULT_QUESTION_SECS: f64 = 15.0;

/// Default interval between detector sampling calls in seconds
pub const DEFAULT_SAMPLE_INTERVAL_SECS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame rate of the control loop
    pub fps: f64,
    /// Length of the calibration window
    pub calibration_secs: f64,
    /// Length of each question window
    pub question_secs: f64,
    /// Interval between sampling calls while a question is open
    pub sample_interval_secs: f64,
    /// Patterns commented on per question
    pub max_commentary: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: REFERENCE_FPS,
            calibration_secs: DEFAULT_CALIBRATION_SECS,
            question_secs: DEFAULT_QUESTION_SECS,
            sample_interval_secs: DEFAULT_SAMPLE_INTERVAL_SECS,
            max_commentary: DEFAULT_MAX_COMMENTARY,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let positive = [
            ("fps", self.fps),
            ("calibration_secs", self.calibration_secs),
            ("question_secs", self.question_secs),
            ("sample_interval_secs", self.sample_interval_secs),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.calibration_secs, 10.0);
        assert_eq!(config.question_secs, 15.0);
        assert_eq!(config.sample_interval_secs, 1.0);
        assert_eq!(config.max_commentary, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"fps": 60}"#).unwrap();
        assert_eq!(config.fps, 60.0);
        assert_eq!(config.question_secs, 15.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_json(r#"{"sample_interval_secs": 0}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)));

        let config = EngineConfig {
            fps: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip() {
        let config = EngineConfig {
            fps: 24.0,
            ..Default::default()
        };
        let loaded = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(config, loaded);
    }
}
