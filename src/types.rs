//! Core data types
//!
//! This module defines the types that flow through the analysis engine:
//! landmark sets from the vision provider, per-frame signal vectors, the
//! calibration baseline, z-scored deltas, detected patterns and the per-question
//! log records consumed by report writers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single 3D landmark point in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another landmark
    pub fn distance(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// Ordered landmark points for one detected face.
///
/// Indices are semantically fixed by the vision provider's face mesh topology.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    pub points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }
}

/// Per-frame signal identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKey {
    EyeOpenness,
    MouthOpenness,
    JawDisplacement,
    BlinkFrame,
}

impl SignalKey {
    /// Every key of the signal schema, in schema order
    pub const ALL: [SignalKey; 4] = [
        SignalKey::EyeOpenness,
        SignalKey::MouthOpenness,
        SignalKey::JawDisplacement,
        SignalKey::BlinkFrame,
    ];

    /// Continuous signals that carry streak state (everything but the blink flag)
    pub const CONTINUOUS: [SignalKey; 3] = [
        SignalKey::EyeOpenness,
        SignalKey::MouthOpenness,
        SignalKey::JawDisplacement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKey::EyeOpenness => "eye_openness",
            SignalKey::MouthOpenness => "mouth_openness",
            SignalKey::JawDisplacement => "jaw_displacement",
            SignalKey::BlinkFrame => "blink_frame",
        }
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar signals derived from one landmark set
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalVector {
    pub eye_openness: f64,
    pub mouth_openness: f64,
    pub jaw_displacement: f64,
    /// 1.0 when the eyes are closed this frame, else 0.0
    pub blink_frame: f64,
}

impl SignalVector {
    pub fn get(&self, key: SignalKey) -> f64 {
        match key {
            SignalKey::EyeOpenness => self.eye_openness,
            SignalKey::MouthOpenness => self.mouth_openness,
            SignalKey::JawDisplacement => self.jaw_displacement,
            SignalKey::BlinkFrame => self.blink_frame,
        }
    }

    pub fn is_blink(&self) -> bool {
        self.blink_frame == 1.0
    }
}

/// Z-scored deviation of a signal vector from the baseline
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeltaVector {
    pub eye_openness: f64,
    pub mouth_openness: f64,
    pub jaw_displacement: f64,
    pub blink_frame: f64,
}

impl DeltaVector {
    pub fn get(&self, key: SignalKey) -> f64 {
        match key {
            SignalKey::EyeOpenness => self.eye_openness,
            SignalKey::MouthOpenness => self.mouth_openness,
            SignalKey::JawDisplacement => self.jaw_displacement,
            SignalKey::BlinkFrame => self.blink_frame,
        }
    }

    pub fn set(&mut self, key: SignalKey, value: f64) {
        match key {
            SignalKey::EyeOpenness => self.eye_openness = value,
            SignalKey::MouthOpenness => self.mouth_openness = value,
            SignalKey::JawDisplacement => self.jaw_displacement = value,
            SignalKey::BlinkFrame => self.blink_frame = value,
        }
    }
}

/// Mean and population standard deviation of one signal
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalStats {
    pub mean: f64,
    pub std: f64,
}

/// Personal reference point captured during calibration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Baseline {
    pub eye_openness: SignalStats,
    pub mouth_openness: SignalStats,
    pub jaw_displacement: SignalStats,
    pub blink_frame: SignalStats,
    /// Blinks per second during calibration (std is synthesized)
    pub blink_rate: SignalStats,
}

impl Baseline {
    pub fn stats(&self, key: SignalKey) -> SignalStats {
        match key {
            SignalKey::EyeOpenness => self.eye_openness,
            SignalKey::MouthOpenness => self.mouth_openness,
            SignalKey::JawDisplacement => self.jaw_displacement,
            SignalKey::BlinkFrame => self.blink_frame,
        }
    }

    pub fn stats_mut(&mut self, key: SignalKey) -> &mut SignalStats {
        match key {
            SignalKey::EyeOpenness => &mut self.eye_openness,
            SignalKey::MouthOpenness => &mut self.mouth_openness,
            SignalKey::JawDisplacement => &mut self.jaw_displacement,
            SignalKey::BlinkFrame => &mut self.blink_frame,
        }
    }
}

/// Directional predicate a streak tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Above the deviation floor
    High,
    /// Below the negative deviation floor
    Low,
    /// Inside the near-zero band
    Flat,
    /// At or below the rigidity ceiling
    Rigid,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::High => "high",
            Direction::Low => "low",
            Direction::Flat => "flat",
            Direction::Rigid => "rigid",
        }
    }
}

/// Rule-level confidence. Ordered so that `Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
}

impl Confidence {
    /// Confidence is a property of how many signals a rule combines
    pub fn for_signal_count(signal_count: usize) -> Self {
        if signal_count >= 2 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pattern emitted by one detector sampling call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedPattern {
    #[serde(rename = "pattern")]
    pub name: String,
    pub description: String,
    pub confidence: Confidence,
}

/// One raw detector emission collected during a question window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSample {
    pub pattern: String,
    pub confidence: Confidence,
    /// Seconds since the question window opened
    pub timestamp: f64,
}

/// A sustained pattern after per-question aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedPattern {
    pub pattern: String,
    pub confidence: Confidence,
    pub hits: u32,
}

/// Observation text attached to a question record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commentary {
    pub observation: String,
    pub interpretation: String,
}

/// Sealed record of one completed question.
///
/// Field order is the persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionLogEntry {
    pub question_id: i64,
    #[serde(default)]
    pub tag: String,
    #[serde(rename = "raw_events")]
    pub raw_event_count: usize,
    #[serde(default)]
    pub patterns: Vec<AggregatedPattern>,
    pub pattern_count: usize,
    #[serde(default)]
    pub commentary: Vec<Commentary>,
}

impl QuestionLogEntry {
    pub fn new(
        question_id: i64,
        tag: impl Into<String>,
        raw_event_count: usize,
        patterns: Vec<AggregatedPattern>,
    ) -> Self {
        let pattern_count = patterns.len();
        Self {
            question_id,
            tag: tag.into(),
            raw_event_count,
            patterns,
            pattern_count,
            commentary: Vec::new(),
        }
    }

    pub fn has_patterns(&self) -> bool {
        self.pattern_count > 0
    }
}
