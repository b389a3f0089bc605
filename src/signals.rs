//! Signal extraction
//!
//! Maps one face-mesh landmark set to the fixed signal schema:
//! - Eye openness: mean of the two per-eye aspect ratios
//! - Mouth openness: lip separation over mouth width
//! - Jaw displacement: raw chin to nose-bridge distance
//! - Blink frame: eye openness under an absolute threshold

use crate::error::AnalysisError;
use crate::types::{Landmark, LandmarkSet, SignalVector};

/// Face mesh landmark indices
pub mod landmark_indices {
    pub const LEFT_EYE_TOP: usize = 159;
    pub const LEFT_EYE_BOTTOM: usize = 145;
    pub const LEFT_EYE_INNER: usize = 133;
    pub const LEFT_EYE_OUTER: usize = 33;

    pub const RIGHT_EYE_TOP: usize = 386;
    pub const RIGHT_EYE_BOTTOM: usize = 374;
    pub const RIGHT_EYE_INNER: usize = 362;
    pub const RIGHT_EYE_OUTER: usize = 263;

    pub const UPPER_LIP: usize = 13;
    pub const LOWER_LIP: usize = 14;
    pub const MOUTH_LEFT: usize = 61;
    pub const MOUTH_RIGHT: usize = 291;

    pub const CHIN: usize = 152;
    pub const NOSE_BRIDGE: usize = 6;

    /// Smallest landmark set that covers every index above
    pub const REQUIRED_POINTS: usize = RIGHT_EYE_TOP + 1;
}

/// Eye openness below this counts as a closed-eye frame
pub const BLINK_THRESHOLD: f64 = 0.15;

/// Floor for ratio denominators
const MIN_DENOMINATOR: f64 = 1e-6;

/// Extractor for per-frame facial signals
pub struct SignalExtractor;

impl SignalExtractor {
    /// Extract the signal vector for one face
    pub fn extract(landmarks: &LandmarkSet) -> Result<SignalVector, AnalysisError> {
        use landmark_indices::*;

        if landmarks.len() < REQUIRED_POINTS {
            return Err(AnalysisError::InvalidLandmarks {
                expected: REQUIRED_POINTS,
                found: landmarks.len(),
            });
        }
        let lm = &landmarks.points;

        let left_ratio = aspect_ratio(
            &lm[LEFT_EYE_TOP],
            &lm[LEFT_EYE_BOTTOM],
            &lm[LEFT_EYE_INNER],
            &lm[LEFT_EYE_OUTER],
        );
        let right_ratio = aspect_ratio(
            &lm[RIGHT_EYE_TOP],
            &lm[RIGHT_EYE_BOTTOM],
            &lm[RIGHT_EYE_INNER],
            &lm[RIGHT_EYE_OUTER],
        );
        let eye_openness = (left_ratio + right_ratio) / 2.0;

        let mouth_openness = aspect_ratio(
            &lm[UPPER_LIP],
            &lm[LOWER_LIP],
            &lm[MOUTH_LEFT],
            &lm[MOUTH_RIGHT],
        );

        // Not normalized: only ever compared against the same face's baseline
        let jaw_displacement = lm[CHIN].distance(&lm[NOSE_BRIDGE]);

        let blink_frame = if eye_openness < BLINK_THRESHOLD { 1.0 } else { 0.0 };

        Ok(SignalVector {
            eye_openness,
            mouth_openness,
            jaw_displacement,
            blink_frame,
        })
    }
}

/// Vertical distance over horizontal distance, denominator floored
fn aspect_ratio(top: &Landmark, bottom: &Landmark, inner: &Landmark, outer: &Landmark) -> f64 {
    top.distance(bottom) / inner.distance(outer).max(MIN_DENOMINATOR)
}
