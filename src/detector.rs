//! Pattern detection
//!
//! A stateful engine fed one delta vector per processed frame. Each continuous
//! signal carries four independent consecutive-frame streaks (high, low, flat,
//! rigid); blink frames are kept in a rolling time window. Sampling evaluates
//! the rule table against that state and only reports a pattern once it has
//! held for several consecutive sampling calls.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::debug;

use crate::rules::{PatternRule, RuleSignal, PATTERN_RULES};
use crate::types::{DeltaVector, DetectedPattern, Direction, SignalKey, SignalVector};

/// Streak length for one second of sustained deviation at the reference rate
pub const SUSTAIN_FRAMES: u32 = 30;

/// Frame rate `SUSTAIN_FRAMES` is calibrated for
pub const REFERENCE_FPS: f64 = 30.0;

/// Z-score beyond which a frame counts as high or low
pub const DEVIATION_FLOOR: f64 = 1.5;

/// Half-width of the near-zero band for flat frames
pub const FLAT_CEILING: f64 = 0.4;

/// Z-score at or below which a frame counts as rigid
pub const RIGID_CEILING: f64 = 0.3;

/// Rolling blink window in seconds
pub const BLINK_WINDOW_SECS: f64 = 5.0;

/// Consecutive qualifying sampling calls before a pattern is emitted
pub const CONFIRM_CALLS: u32 = 2;

/// Baseline blink rates below this use the absolute thresholds
const NEAR_ZERO_BLINK_RATE: f64 = 0.01;

/// Absolute blinks/sec above which blinking is high for a non-blinker
const ABSOLUTE_HIGH_BLINK_RATE: f64 = 0.6;

/// Rate ratio above which blinking is high
const HIGH_BLINK_RATIO: f64 = 2.0;

/// Rate ratio below which blinking is low
const LOW_BLINK_RATIO: f64 = 0.3;

/// Consecutive-frame counters for one signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakCounters {
    pub high: u32,
    pub low: u32,
    pub flat: u32,
    pub rigid: u32,
}

impl StreakCounters {
    fn update(&mut self, delta: f64) {
        bump(&mut self.high, delta > DEVIATION_FLOOR);
        bump(&mut self.low, delta < -DEVIATION_FLOOR);
        bump(&mut self.flat, delta.abs() < FLAT_CEILING);
        bump(&mut self.rigid, delta <= RIGID_CEILING);
    }

    pub fn get(&self, direction: Direction) -> u32 {
        match direction {
            Direction::High => self.high,
            Direction::Low => self.low,
            Direction::Flat => self.flat,
            Direction::Rigid => self.rigid,
        }
    }
}

/// Increment on a qualifying frame, reset on anything else
fn bump(counter: &mut u32, qualifies: bool) {
    if qualifies {
        *counter += 1;
    } else {
        *counter = 0;
    }
}

/// Streak-and-confirmation pattern detector
#[derive(Debug, Clone)]
pub struct PatternDetector {
    fps: f64,
    sustain_frames: u32,
    streaks: BTreeMap<SignalKey, StreakCounters>,
    blink_times: VecDeque<f64>,
    baseline_blink_rate: f64,
    confirmations: HashMap<&'static str, u32>,
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new(REFERENCE_FPS)
    }
}

impl PatternDetector {
    /// Create a detector whose sustain window spans about one real second at `fps`
    pub fn new(fps: f64) -> Self {
        let sustain_frames = (SUSTAIN_FRAMES as f64 * (fps / REFERENCE_FPS))
            .round()
            .max(1.0) as u32;
        Self {
            fps,
            sustain_frames,
            streaks: BTreeMap::new(),
            blink_times: VecDeque::new(),
            baseline_blink_rate: 0.0,
            confirmations: HashMap::new(),
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn sustain_frames(&self) -> u32 {
        self.sustain_frames
    }

    /// Set the calibration blink rate (blinks per second)
    pub fn set_baseline_blink_rate(&mut self, rate: f64) {
        self.baseline_blink_rate = rate;
    }

    pub fn baseline_blink_rate(&self) -> f64 {
        self.baseline_blink_rate
    }

    /// Current streak for a signal and direction
    pub fn streak(&self, key: SignalKey, direction: Direction) -> u32 {
        self.streaks
            .get(&key)
            .map(|s| s.get(direction))
            .unwrap_or(0)
    }

    /// Blinks currently inside the rolling window
    pub fn blinks_in_window(&self) -> usize {
        self.blink_times.len()
    }

    /// Current confirmation count for a pattern
    pub fn confirmation(&self, pattern: &str) -> u32 {
        self.confirmations.get(pattern).copied().unwrap_or(0)
    }

    /// Update streaks and the blink window with one processed frame
    pub fn feed(&mut self, deltas: &DeltaVector, signals: &SignalVector, timestamp: f64) {
        for key in SignalKey::CONTINUOUS {
            self.streaks
                .entry(key)
                .or_default()
                .update(deltas.get(key));
        }

        if signals.is_blink() {
            self.blink_times.push_back(timestamp);
        }

        let cutoff = timestamp - BLINK_WINDOW_SECS;
        while self.blink_times.front().is_some_and(|&t| t < cutoff) {
            self.blink_times.pop_front();
        }
    }

    /// Evaluate every rule and return the patterns confirmed on this call
    pub fn sample(&mut self) -> Vec<DetectedPattern> {
        let mut detected = Vec::new();

        for rule in PATTERN_RULES {
            let holds = self.rule_holds(rule);

            let count = self.confirmations.entry(rule.name).or_insert(0);
            if holds {
                *count += 1;
            } else {
                *count = 0;
            }

            if *count >= CONFIRM_CALLS {
                debug!(pattern = rule.name, confirmations = *count, "pattern confirmed");
                detected.push(DetectedPattern {
                    name: rule.name.to_string(),
                    description: rule.description.to_string(),
                    confidence: rule.confidence(),
                });
            }
        }

        detected
    }

    /// Clear all streaks, blinks and confirmations
    pub fn reset(&mut self) {
        self.streaks.clear();
        self.blink_times.clear();
        self.confirmations.clear();
        debug!("detector state reset");
    }

    fn rule_holds(&self, rule: &PatternRule) -> bool {
        rule.requires
            .iter()
            .all(|&(signal, direction)| self.check_signal(signal, direction))
    }

    fn check_signal(&self, signal: RuleSignal, direction: Direction) -> bool {
        match signal.signal_key() {
            Some(key) => self.streak(key, direction) >= self.sustain_frames,
            None => self.check_blink_rate(direction),
        }
    }

    fn check_blink_rate(&self, direction: Direction) -> bool {
        let current_rate = self.blink_times.len() as f64 / BLINK_WINDOW_SECS;
        let baseline = self.baseline_blink_rate;

        if baseline < NEAR_ZERO_BLINK_RATE {
            return match direction {
                Direction::High => current_rate > ABSOLUTE_HIGH_BLINK_RATE,
                Direction::Low => current_rate == 0.0 && self.blink_times.is_empty(),
                _ => false,
            };
        }

        let ratio = current_rate / baseline;
        match direction {
            Direction::High => ratio > HIGH_BLINK_RATIO,
            Direction::Low => ratio < LOW_BLINK_RATIO,
            _ => false,
        }
    }
}

/// Render detected patterns as console lines
pub fn format_patterns(patterns: &[DetectedPattern]) -> String {
    patterns
        .iter()
        .map(|p| {
            format!(
                "  [{:6}] {:25} — {}",
                p.confidence.as_str().to_uppercase(),
                p.name,
                p.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
