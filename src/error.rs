//! Error types for the analysis engine

use thiserror::Error;

/// Errors that can occur during analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Landmark set too short: expected at least {expected} points, found {found}")]
    InvalidLandmarks { expected: usize, found: usize },

    #[error("Calibration produced no signal frames")]
    EmptyCalibration,

    #[error("Invalid phase transition: {0}")]
    PhaseError(String),
}
