//! Session orchestration
//!
//! This module provides the stateful entry point of the engine. An
//! `InterrogationProcessor` is owned by the caller's control loop and carries
//! every piece of session state: the calibration buffer, the baseline, the
//! detector, the open question window and the session log. Phrase usage lives
//! in a `CommentaryContext` the caller owns and passes to `end_question`, so
//! it can span several sessions.
//!
//! Phases: calibration → (question → idle)* → finish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::baseline::BaselineCalibrator;
use crate::commentary::{CommentaryContext, PhraseBank};
use crate::config::EngineConfig;
use crate::detector::PatternDetector;
use crate::error::AnalysisError;
use crate::normalizer::DeltaNormalizer;
use crate::question::QuestionAggregator;
use crate::session::{SessionAggregate, SessionAggregator, SessionClassification};
use crate::signals::SignalExtractor;
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use crate::types::{
    Baseline, DetectedPattern, LandmarkSet, PatternSample, QuestionLogEntry, SignalVector,
};

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Not started
    Pending,
    /// Collecting the resting baseline
    Calibrating,
    /// Calibrated, no question open
    Idle,
    /// A question window is open
    Question,
}

/// Question window being observed
#[derive(Debug, Clone)]
struct OpenQuestion {
    id: i64,
    tag: String,
    started_at: f64,
    last_sample_at: f64,
    samples: Vec<PatternSample>,
}

/// Calibration window being observed
#[derive(Debug, Clone, Default)]
struct Calibration {
    started_at: f64,
    history: Vec<SignalVector>,
    blinks: u32,
    last_blink: bool,
}

/// Final output of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub producer: String,
    pub engine_version: String,
    pub generated_at: DateTime<Utc>,
    pub baseline: Option<Baseline>,
    pub log: Vec<QuestionLogEntry>,
    pub aggregate: SessionAggregate,
}

impl SessionReport {
    pub fn classification(&self) -> SessionClassification {
        self.aggregate.classification
    }
}

/// Stateful processor for one interrogation session
#[derive(Debug)]
pub struct InterrogationProcessor {
    config: EngineConfig,
    phase: Phase,
    detector: PatternDetector,
    calibration: Calibration,
    baseline: Option<Baseline>,
    question: Option<OpenQuestion>,
    log: Vec<QuestionLogEntry>,
    phrases: PhraseBank,
}

impl Default for InterrogationProcessor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl InterrogationProcessor {
    /// Create a processor with the given configuration and an empty phrase bank
    pub fn new(config: EngineConfig) -> Self {
        Self {
            detector: PatternDetector::new(config.fps),
            config,
            phase: Phase::Pending,
            calibration: Calibration::default(),
            baseline: None,
            question: None,
            log: Vec::new(),
            phrases: PhraseBank::default(),
        }
    }

    /// Use a phrase bank for per-question commentary
    pub fn with_phrase_bank(mut self, phrases: PhraseBank) -> Self {
        self.phrases = phrases;
        self
    }

    /// Start from a previously saved baseline instead of calibrating
    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.detector.set_baseline_blink_rate(baseline.blink_rate.mean);
        self.baseline = Some(baseline);
        self.phase = Phase::Idle;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn detector(&self) -> &PatternDetector {
        &self.detector
    }

    /// Sealed question records so far
    pub fn session_log(&self) -> &[QuestionLogEntry] {
        &self.log
    }

    /// Whether the calibration window has run its configured length
    pub fn calibration_due(&self, now: f64) -> bool {
        self.phase == Phase::Calibrating
            && now - self.calibration.started_at >= self.config.calibration_secs
    }

    /// Whether the open question has run its configured length
    pub fn question_due(&self, now: f64) -> bool {
        self.question
            .as_ref()
            .is_some_and(|q| now - q.started_at >= self.config.question_secs)
    }

    /// Start (or restart) calibration. Any previous baseline is discarded.
    pub fn begin_calibration(&mut self, now: f64) {
        self.calibration = Calibration {
            started_at: now,
            ..Default::default()
        };
        self.baseline = None;
        self.question = None;
        self.phase = Phase::Calibrating;
        info!(at = now, "calibration started");
    }

    /// Observe one tick of landmarks. `None` means no face this tick.
    pub fn observe(
        &mut self,
        landmarks: Option<&LandmarkSet>,
        now: f64,
    ) -> Result<Vec<DetectedPattern>, AnalysisError> {
        let signals = landmarks.map(SignalExtractor::extract).transpose()?;
        Ok(self.observe_signals(signals, now))
    }

    /// Observe one tick of precomputed signals.
    ///
    /// Returns the patterns emitted if a sampling call happened on this tick.
    /// A missing frame is skipped entirely, so streaks stay where they were.
    pub fn observe_signals(&mut self, signals: Option<SignalVector>, now: f64) -> Vec<DetectedPattern> {
        let Some(signals) = signals else {
            return Vec::new();
        };

        match self.phase {
            Phase::Pending => Vec::new(),
            Phase::Calibrating => {
                self.collect_calibration(signals);
                Vec::new()
            }
            Phase::Idle | Phase::Question => {
                let Some(baseline) = self.baseline.as_ref() else {
                    return Vec::new();
                };
                let deltas = DeltaNormalizer::normalize(&signals, baseline);
                self.detector.feed(&deltas, &signals, now);
                self.sample_if_due(now)
            }
        }
    }

    /// Close calibration and compute the baseline
    pub fn finish_calibration(&mut self, now: f64) -> Result<&Baseline, AnalysisError> {
        if self.phase != Phase::Calibrating {
            return Err(AnalysisError::PhaseError(format!(
                "cannot finish calibration while {:?}",
                self.phase
            )));
        }

        let elapsed = now - self.calibration.started_at;
        let baseline = BaselineCalibrator::calibrate(
            &self.calibration.history,
            self.calibration.blinks,
            elapsed,
        )?;

        info!(
            frames = self.calibration.history.len(),
            blinks = self.calibration.blinks,
            elapsed_secs = elapsed,
            blink_rate = baseline.blink_rate.mean,
            "baseline established"
        );

        self.detector.set_baseline_blink_rate(baseline.blink_rate.mean);
        self.detector.reset();
        self.calibration = Calibration::default();
        self.phase = Phase::Idle;

        Ok(self.baseline.insert(baseline))
    }

    /// Open a question window
    pub fn begin_question(
        &mut self,
        question_id: i64,
        tag: impl Into<String>,
        now: f64,
    ) -> Result<(), AnalysisError> {
        if self.phase != Phase::Idle {
            return Err(AnalysisError::PhaseError(format!(
                "cannot begin question {} while {:?}",
                question_id, self.phase
            )));
        }

        let tag = tag.into();
        info!(question_id, tag = tag.as_str(), "question started");
        self.question = Some(OpenQuestion {
            id: question_id,
            tag,
            started_at: now,
            last_sample_at: now,
            samples: Vec::new(),
        });
        self.phase = Phase::Question;
        Ok(())
    }

    /// Seal the open question: final sample, aggregation, commentary.
    ///
    /// Commentary picks avoid phrases already recorded in `commentary`. The
    /// detector is reset so nothing carries into the next window.
    pub fn end_question(
        &mut self,
        now: f64,
        commentary: &mut CommentaryContext,
    ) -> Result<&QuestionLogEntry, AnalysisError> {
        if self.phase != Phase::Question {
            return Err(AnalysisError::PhaseError(format!(
                "no open question to end while {:?}",
                self.phase
            )));
        }

        let detected = self.detector.sample();
        let mut question = self
            .question
            .take()
            .ok_or_else(|| AnalysisError::PhaseError("question state missing".to_string()))?;
        record_samples(&mut question, &detected, now);

        let patterns = QuestionAggregator::aggregate(&question.samples);
        let mut entry =
            QuestionLogEntry::new(question.id, question.tag, question.samples.len(), patterns);
        entry.commentary = commentary.question_commentary(
            &self.phrases,
            &entry.patterns,
            self.config.max_commentary,
        );

        debug!(
            question_id = entry.question_id,
            raw_events = entry.raw_event_count,
            pattern_count = entry.pattern_count,
            "question sealed"
        );

        self.detector.reset();
        self.phase = Phase::Idle;
        self.log.push(entry);

        let sealed = self.log.len() - 1;
        Ok(&self.log[sealed])
    }

    /// Aggregate the whole session. Any open question is discarded.
    pub fn finish(&mut self) -> SessionReport {
        if let Some(question) = self.question.take() {
            debug!(
                question_id = question.id,
                samples = question.samples.len(),
                "discarding unfinished question"
            );
            self.phase = Phase::Idle;
        }

        let aggregate = SessionAggregator::aggregate(&self.log);
        info!(
            questions = aggregate.total_questions,
            with_patterns = aggregate.questions_with_patterns,
            "session finished"
        );

        SessionReport {
            session_id: Uuid::new_v4().to_string(),
            producer: PRODUCER_NAME.to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            generated_at: Utc::now(),
            baseline: self.baseline.clone(),
            log: self.log.clone(),
            aggregate,
        }
    }

    fn collect_calibration(&mut self, signals: SignalVector) {
        // count blink onsets, not closed-eye frames
        let is_blink = signals.is_blink();
        if is_blink && !self.calibration.last_blink {
            self.calibration.blinks += 1;
        }
        self.calibration.last_blink = is_blink;
        self.calibration.history.push(signals);
    }

    fn sample_if_due(&mut self, now: f64) -> Vec<DetectedPattern> {
        let interval = self.config.sample_interval_secs;
        let Some(question) = self.question.as_mut() else {
            return Vec::new();
        };
        if now - question.last_sample_at < interval {
            return Vec::new();
        }

        let detected = self.detector.sample();
        record_samples(question, &detected, now);
        question.last_sample_at = now;
        detected
    }
}

fn record_samples(question: &mut OpenQuestion, detected: &[DetectedPattern], now: f64) {
    let elapsed = ((now - question.started_at) * 100.0).round() / 100.0;
    question
        .samples
        .extend(detected.iter().map(|p| PatternSample {
            pattern: p.name.clone(),
            confidence: p.confidence,
            timestamp: elapsed,
        }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Category;
    use crate::signals::tests::face;
    use crate::types::Confidence;
    use pretty_assertions::assert_eq;

    const FRAME: f64 = 1.0 / 30.0;

    fn resting(i: usize) -> SignalVector {
        // small alternating jitter so every signal has a spread
        let jitter = if i % 2 == 0 { 0.01 } else { -0.01 };
        SignalVector {
            eye_openness: 0.30 + jitter,
            mouth_openness: 0.10 + jitter,
            jaw_displacement: 0.45 + jitter,
            blink_frame: 0.0,
        }
    }

    fn clenched() -> SignalVector {
        // mouth and jaw well below baseline, eyes at rest
        SignalVector {
            eye_openness: 0.30,
            mouth_openness: 0.05,
            jaw_displacement: 0.40,
            blink_frame: 0.0,
        }
    }

    /// Calibrate over 10 seconds with two blink onsets
    fn calibrated() -> InterrogationProcessor {
        let mut processor = InterrogationProcessor::default();
        processor.begin_calibration(0.0);
        let mut t = 0.0;
        for i in 0..300 {
            let mut s = resting(i);
            if i == 100 || i == 101 || i == 200 {
                s.blink_frame = 1.0;
            }
            processor.observe_signals(Some(s), t);
            t += FRAME;
        }
        processor.finish_calibration(10.0).unwrap();
        processor
    }

    fn unremarkable(i: usize) -> SignalVector {
        // slightly above baseline everywhere, blinking every three seconds
        SignalVector {
            eye_openness: 0.31,
            mouth_openness: 0.11,
            jaw_displacement: 0.46,
            blink_frame: if i % 90 == 0 { 1.0 } else { 0.0 },
        }
    }

    /// Run a question window of `secs` seconds, frame `i` carrying `signals(i)`
    fn run_question(
        processor: &mut InterrogationProcessor,
        id: i64,
        tag: &str,
        start: f64,
        secs: f64,
        signals: impl Fn(usize) -> SignalVector,
    ) -> QuestionLogEntry {
        processor.begin_question(id, tag, start).unwrap();
        let frames = (secs * 30.0) as usize;
        let mut t = start;
        for i in 0..frames {
            t += FRAME;
            processor.observe_signals(Some(signals(i)), t);
        }
        processor
            .end_question(t, &mut CommentaryContext::new())
            .unwrap()
            .clone()
    }

    #[test]
    fn test_calibration_counts_blink_onsets() {
        let processor = calibrated();
        let baseline = processor.baseline().unwrap();

        assert!((baseline.blink_rate.mean - 0.2).abs() < 1e-12);
        assert!((baseline.eye_openness.mean - 0.30).abs() < 1e-9);
        assert_eq!(processor.phase(), Phase::Idle);
        assert_eq!(processor.detector().baseline_blink_rate(), baseline.blink_rate.mean);
    }

    #[test]
    fn test_empty_calibration_fails() {
        let mut processor = InterrogationProcessor::default();
        processor.begin_calibration(0.0);
        processor.observe_signals(None, 1.0);

        let result = processor.finish_calibration(10.0);
        assert!(matches!(result, Err(AnalysisError::EmptyCalibration)));
    }

    #[test]
    fn test_phase_errors() {
        let mut processor = InterrogationProcessor::default();
        assert!(matches!(
            processor.begin_question(1, "", 0.0),
            Err(AnalysisError::PhaseError(_))
        ));
        assert!(matches!(
            processor.end_question(0.0, &mut CommentaryContext::new()),
            Err(AnalysisError::PhaseError(_))
        ));
        assert!(matches!(
            processor.finish_calibration(0.0),
            Err(AnalysisError::PhaseError(_))
        ));
    }

    #[test]
    fn test_sustained_clench_is_logged() {
        let mut processor = calibrated();
        let entry = run_question(&mut processor, 1, "loyalty", 20.0, 15.0, |_| clenched());

        let names: Vec<&str> = entry.patterns.iter().map(|p| p.pattern.as_str()).collect();
        assert!(names.contains(&"mouth_clamp"));
        assert!(names.contains(&"jaw_tension"));
        assert!(names.contains(&"facial_constraint"));
        assert_eq!(entry.pattern_count, entry.patterns.len());
        assert_eq!(entry.tag, "loyalty");

        let constraint = entry
            .patterns
            .iter()
            .find(|p| p.pattern == "facial_constraint")
            .unwrap();
        assert_eq!(constraint.confidence, Confidence::Medium);
        assert!(constraint.hits >= 2);

        // Detector starts the next window clean
        assert_eq!(processor.detector().confirmation("mouth_clamp"), 0);
    }

    #[test]
    fn test_missing_frames_freeze_streaks() {
        let mut processor = calibrated();
        processor.begin_question(1, "", 20.0).unwrap();

        for i in 0..10 {
            processor.observe_signals(Some(clenched()), 20.0 + i as f64 * FRAME);
        }
        let before = processor
            .detector()
            .streak(crate::types::SignalKey::MouthOpenness, crate::types::Direction::Low);
        assert_eq!(before, 10);

        for i in 0..50 {
            processor.observe(None, 21.0 + i as f64 * FRAME).unwrap();
        }
        let after = processor
            .detector()
            .streak(crate::types::SignalKey::MouthOpenness, crate::types::Direction::Low);
        assert_eq!(after, before);
    }

    #[test]
    fn test_landmark_frames_drive_the_pipeline() {
        let mut processor = InterrogationProcessor::default();
        processor.begin_calibration(0.0);
        for i in 0..30 {
            let chin = if i % 2 == 0 { 0.45 } else { 0.46 };
            processor
                .observe(Some(&face(0.03, 0.02, chin)), i as f64 * FRAME)
                .unwrap();
        }
        let baseline = processor.finish_calibration(1.0).unwrap();
        assert!((baseline.jaw_displacement.mean - 0.455).abs() < 1e-9);

        let short = LandmarkSet::default();
        assert!(matches!(
            processor.observe(Some(&short), 2.0),
            Err(AnalysisError::InvalidLandmarks { .. })
        ));
    }

    #[test]
    fn test_unremarkable_session_is_sparse() {
        let mut processor = calibrated();
        let mut start = 20.0;
        for id in 1..=4 {
            let entry = run_question(&mut processor, id, "", start, 3.0, unremarkable);
            assert_eq!(entry.raw_event_count, 0);
            assert_eq!(entry.commentary[0].observation, crate::commentary::NULL_OBSERVATION);
            start += 10.0;
        }

        let report = processor.finish();
        assert_eq!(report.log.len(), 4);
        assert_eq!(report.aggregate.total_questions, 4);
        assert_eq!(report.classification(), SessionClassification::Sparse);
        assert!(report.baseline.is_some());
        assert!(!report.session_id.is_empty());
    }

    #[test]
    fn test_recurring_control_dominates() {
        let mut processor = calibrated();
        let mut start = 20.0;
        for id in 1..=3 {
            run_question(&mut processor, id, "pressure", start, 5.0, |_| clenched());
            start += 10.0;
        }

        let report = processor.finish();
        let jaw = report.aggregate.get("jaw_tension").unwrap();
        assert_eq!(jaw.question_count, 3);
        assert_eq!(jaw.questions, vec![1, 2, 3]);
        assert_eq!(
            report.classification(),
            SessionClassification::Dominant(Category::Control)
        );
    }

    #[test]
    fn test_finish_discards_open_question() {
        let mut processor = calibrated();
        processor.begin_question(7, "", 20.0).unwrap();
        for i in 0..90 {
            processor.observe_signals(Some(clenched()), 20.0 + i as f64 * FRAME);
        }

        let report = processor.finish();
        assert!(report.log.is_empty());
        assert_eq!(processor.phase(), Phase::Idle);
    }

    #[test]
    fn test_saved_baseline_skips_calibration() {
        let baseline = calibrated().baseline().cloned().unwrap();
        let mut processor = InterrogationProcessor::default().with_baseline(baseline);

        assert_eq!(processor.phase(), Phase::Idle);
        assert!(processor.begin_question(1, "", 0.0).is_ok());
    }

    #[test]
    fn test_commentary_context_spans_questions_and_sessions() {
        let phrases = PhraseBank::from_json(
            r#"{"jaw_tension": {"low": [
                {"observation": "Jaw held still.", "interpretation": ""},
                {"observation": "Jaw locked.", "interpretation": ""},
                {"observation": "Jaw set.", "interpretation": ""}
            ]}}"#,
        )
        .unwrap();
        let mut commentary = CommentaryContext::new();

        let mut clench = |processor: &mut InterrogationProcessor, id: i64, start: f64| {
            processor.begin_question(id, "", start).unwrap();
            let mut t = start;
            for _ in 0..150 {
                t += FRAME;
                processor.observe_signals(Some(clenched()), t);
            }
            let entry = processor.end_question(t, &mut commentary).unwrap();
            entry.commentary[0].observation.clone()
        };

        let mut first = calibrated().with_phrase_bank(phrases.clone());
        let a = clench(&mut first, 1, 20.0);
        let b = clench(&mut first, 2, 30.0);

        // A fresh session sharing the context keeps rotating
        let mut second = calibrated().with_phrase_bank(phrases);
        let c = clench(&mut second, 1, 20.0);

        assert_eq!(
            vec![a, b, c],
            vec!["Jaw held still.", "Jaw locked.", "Jaw set."]
        );
    }
}
