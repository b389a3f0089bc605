//! Delta normalization
//!
//! Converts a signal vector into z-scores against the calibration baseline.

use crate::types::{Baseline, DeltaVector, SignalKey, SignalVector};

/// Spreads below this are treated as zero; the delta is then exactly 0
pub const MIN_STD: f64 = 1e-6;

/// Normalizer for converting signal vectors to deltas
pub struct DeltaNormalizer;

impl DeltaNormalizer {
    /// Z-score every signal against its baseline
    pub fn normalize(signals: &SignalVector, baseline: &Baseline) -> DeltaVector {
        let mut deltas = DeltaVector::default();
        for key in SignalKey::ALL {
            let stats = baseline.stats(key);
            deltas.set(key, z_score(signals.get(key), stats.mean, stats.std));
        }
        deltas
    }
}

fn z_score(value: f64, mean: f64, std: f64) -> f64 {
    if std < MIN_STD {
        0.0
    } else {
        (value - mean) / std
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalStats;

    fn baseline() -> Baseline {
        Baseline {
            eye_openness: SignalStats { mean: 0.30, std: 0.02 },
            mouth_openness: SignalStats { mean: 0.10, std: 0.0 },
            jaw_displacement: SignalStats { mean: 0.45, std: 5e-7 },
            blink_frame: SignalStats { mean: 0.0, std: 0.0 },
            blink_rate: SignalStats { mean: 0.2, std: 0.1 },
        }
    }

    #[test]
    fn test_z_scores() {
        let signals = SignalVector {
            eye_openness: 0.26,
            mouth_openness: 0.10,
            jaw_displacement: 0.45,
            blink_frame: 0.0,
        };

        let deltas = DeltaNormalizer::normalize(&signals, &baseline());
        assert!((deltas.eye_openness + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_tiny_std_yields_zero_delta() {
        let signals = SignalVector {
            eye_openness: 0.30,
            mouth_openness: 42.0,
            jaw_displacement: -1000.0,
            blink_frame: 1.0,
        };

        let deltas = DeltaNormalizer::normalize(&signals, &baseline());
        assert_eq!(deltas.mouth_openness, 0.0);
        assert_eq!(deltas.jaw_displacement, 0.0);
        assert_eq!(deltas.blink_frame, 0.0);
        assert!(deltas.mouth_openness.is_finite());
    }
}
