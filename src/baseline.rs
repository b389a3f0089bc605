//! Baseline calibration
//!
//! This module computes a personal baseline from the signal vectors collected
//! during the still, resting calibration window. Every later comparison is made
//! against this baseline.

use crate::error::AnalysisError;
use crate::types::{Baseline, SignalKey, SignalStats, SignalVector};

/// Default calibration window in seconds
pub const DEFAULT_CALIBRATION_SECS: f64 = 10.0;

/// Synthesized blink-rate spread as a fraction of the mean
const BLINK_RATE_STD_FACTOR: f64 = 0.3;

/// Lower bound on the synthesized blink-rate spread
const BLINK_RATE_STD_FLOOR: f64 = 0.1;

/// Calibrator turning a window of signal vectors into a baseline
pub struct BaselineCalibrator;

impl BaselineCalibrator {
    /// Compute the baseline for a calibration window.
    ///
    /// # Arguments
    /// * `history` - Signal vectors observed during calibration, in order
    /// * `blinks` - Number of blinks observed in the same window
    /// * `elapsed_secs` - Length of the window in seconds
    ///
    /// Returns `EmptyCalibration` when no frames were collected.
    pub fn calibrate(
        history: &[SignalVector],
        blinks: u32,
        elapsed_secs: f64,
    ) -> Result<Baseline, AnalysisError> {
        if history.is_empty() {
            return Err(AnalysisError::EmptyCalibration);
        }

        let mut baseline = Baseline::default();
        for key in SignalKey::ALL {
            let values: Vec<f64> = history.iter().map(|s| s.get(key)).collect();
            *baseline.stats_mut(key) = population_stats(&values);
        }

        baseline.blink_rate = blink_rate_stats(blinks, elapsed_secs);

        Ok(baseline)
    }
}

/// Blink-rate baseline. The spread is synthesized, not measured.
pub fn blink_rate_stats(blinks: u32, elapsed_secs: f64) -> SignalStats {
    let mean = if elapsed_secs > 0.0 {
        blinks as f64 / elapsed_secs
    } else {
        0.0
    };
    SignalStats {
        mean,
        std: (mean * BLINK_RATE_STD_FACTOR).max(BLINK_RATE_STD_FLOOR),
    }
}

/// Mean and population standard deviation
fn population_stats(values: &[f64]) -> SignalStats {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    SignalStats {
        mean,
        std: variance.sqrt(),
    }
}

impl Baseline {
    /// Load a baseline from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the baseline to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
