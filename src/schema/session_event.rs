//! alibi.session_event.v1 schema definition
//!
//! A recorded session is a stream of timestamped events, one per line:
//! - Phase markers (calibration start/end, question start/end, session end)
//! - Frames carrying raw landmarks, precomputed signals, or nothing (no face)

use serde::{Deserialize, Serialize};

use crate::types::{LandmarkSet, SignalKey, SignalVector};

/// Current schema version
pub const SESSION_SCHEMA_VERSION: &str = "alibi.session_event.v1";

/// One recorded session event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Schema version (must be "alibi.session_event.v1")
    pub schema_version: String,

    /// Seconds since an arbitrary session epoch
    pub t: f64,

    #[serde(flatten)]
    pub kind: EventKind,
}

/// What happened at `t`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    CalibrationStart,
    Frame(FramePayload),
    CalibrationEnd,
    QuestionStart {
        question_id: i64,
        #[serde(default)]
        tag: String,
    },
    QuestionEnd,
    SessionEnd,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CalibrationStart => "calibration_start",
            EventKind::Frame(_) => "frame",
            EventKind::CalibrationEnd => "calibration_end",
            EventKind::QuestionStart { .. } => "question_start",
            EventKind::QuestionEnd => "question_end",
            EventKind::SessionEnd => "session_end",
        }
    }
}

/// Frame contents. Both fields absent means no face was detected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FramePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<LandmarkSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<SignalVector>,
}

impl FramePayload {
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_none() && self.signals.is_none()
    }
}

impl SessionEvent {
    pub fn new(t: f64, kind: EventKind) -> Self {
        SessionEvent {
            schema_version: SESSION_SCHEMA_VERSION.to_string(),
            t,
            kind,
        }
    }

    pub fn landmarks(t: f64, landmarks: LandmarkSet) -> Self {
        Self::new(
            t,
            EventKind::Frame(FramePayload {
                landmarks: Some(landmarks),
                signals: None,
            }),
        )
    }

    pub fn signals(t: f64, signals: SignalVector) -> Self {
        Self::new(
            t,
            EventKind::Frame(FramePayload {
                landmarks: None,
                signals: Some(signals),
            }),
        )
    }

    pub fn no_face(t: f64) -> Self {
        Self::new(t, EventKind::Frame(FramePayload::default()))
    }

    pub fn question_start(t: f64, question_id: i64, tag: impl Into<String>) -> Self {
        Self::new(
            t,
            EventKind::QuestionStart {
                question_id,
                tag: tag.into(),
            },
        )
    }

    /// Validate the event
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SESSION_SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SESSION_SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        if !self.t.is_finite() || self.t < 0.0 {
            return Err(ValidationError::InvalidTimestamp(self.t));
        }

        if let EventKind::Frame(frame) = &self.kind {
            if frame.landmarks.is_some() && frame.signals.is_some() {
                return Err(ValidationError::AmbiguousFrame);
            }
            if let Some(signals) = &frame.signals {
                for key in SignalKey::ALL {
                    if !signals.get(key).is_finite() {
                        return Err(ValidationError::NonFiniteSignal(key.as_str().to_string()));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Validation errors for session events
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Invalid timestamp: {0} (must be finite and non-negative)")]
    InvalidTimestamp(f64),

    #[error("Frame carries both landmarks and signals")]
    AmbiguousFrame,

    #[error("Signal {0} is not a finite number")]
    NonFiniteSignal(String),
}
