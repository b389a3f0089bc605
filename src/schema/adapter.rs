//! Adapter for replaying alibi.session_event.v1 streams
//!
//! This module parses recorded event streams and drives an
//! `InterrogationProcessor` through them, producing the same session report a
//! live run would.

use tracing::warn;

use crate::commentary::{CommentaryContext, PhraseBank};
use crate::config::EngineConfig;
use crate::error::AnalysisError;
use crate::pipeline::{InterrogationProcessor, SessionReport};
use crate::schema::session_event::*;

/// Adapter for parsing and replaying recorded session events
pub struct SessionEventAdapter;

impl SessionEventAdapter {
    /// Parse a JSON string containing an array of SessionEvents
    pub fn parse_array(json: &str) -> Result<Vec<SessionEvent>, AnalysisError> {
        let events: Vec<SessionEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing SessionEvents
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<SessionEvent>, AnalysisError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(AnalysisError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Validate a batch of events, returning only the failures
    pub fn validate_events(events: &[SessionEvent]) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        let mut last_t = f64::NEG_INFINITY;

        for (idx, event) in events.iter().enumerate() {
            let error = match event.validate() {
                Err(e) => Some(e),
                Ok(()) if event.t < last_t => Some(ValidationError::InvalidTimestamp(event.t)),
                Ok(()) => None,
            };
            if event.t.is_finite() {
                last_t = last_t.max(event.t);
            }
            if let Some(error) = error {
                results.push(ValidationResult {
                    index: idx,
                    kind: event.kind.as_str(),
                    result: Some(error),
                });
            }
        }

        results
    }

    /// Drive a processor through the events and return the session report.
    ///
    /// Frames whose landmark set is too short are skipped with a warning;
    /// every other problem aborts the replay. Events after `session_end` are
    /// ignored.
    pub fn replay(
        events: &[SessionEvent],
        config: EngineConfig,
        phrases: Option<PhraseBank>,
    ) -> Result<SessionReport, AnalysisError> {
        config.validate()?;

        let mut processor = InterrogationProcessor::new(config);
        if let Some(phrases) = phrases {
            processor = processor.with_phrase_bank(phrases);
        }

        let mut commentary = CommentaryContext::new();
        let mut last_t = f64::NEG_INFINITY;
        for (idx, event) in events.iter().enumerate() {
            if let Err(e) = event.validate() {
                return Err(AnalysisError::ParseError(format!(
                    "Invalid event {}: {}",
                    idx + 1,
                    e
                )));
            }
            if event.t < last_t {
                return Err(AnalysisError::ParseError(format!(
                    "Event {} goes back in time: {} after {}",
                    idx + 1,
                    event.t,
                    last_t
                )));
            }
            last_t = event.t;

            match &event.kind {
                EventKind::CalibrationStart => processor.begin_calibration(event.t),
                EventKind::Frame(frame) => {
                    if let Some(landmarks) = &frame.landmarks {
                        match processor.observe(Some(landmarks), event.t) {
                            Ok(_) => {}
                            Err(AnalysisError::InvalidLandmarks { expected, found }) => {
                                warn!(event = idx + 1, expected, found, "skipping malformed frame");
                            }
                            Err(e) => return Err(e),
                        }
                    } else {
                        processor.observe_signals(frame.signals, event.t);
                    }
                }
                EventKind::CalibrationEnd => {
                    processor.finish_calibration(event.t)?;
                }
                EventKind::QuestionStart { question_id, tag } => {
                    processor.begin_question(*question_id, tag.as_str(), event.t)?;
                }
                EventKind::QuestionEnd => {
                    processor.end_question(event.t, &mut commentary)?;
                }
                EventKind::SessionEnd => break,
            }
        }

        Ok(processor.finish())
    }

    /// Serialize events as NDJSON
    pub fn to_ndjson(events: &[SessionEvent]) -> Result<String, AnalysisError> {
        let mut out = String::new();
        for event in events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Result of event validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub kind: &'static str,
    pub result: Option<ValidationError>,
}
