//! Pattern rule table
//!
//! Rules are plain data: a name, the directions that must hold per signal and
//! the number of signals combined. A single generic evaluator in the detector
//! consumes them.

use crate::types::{Confidence, Direction, SignalKey};
use serde::Serialize;

/// Signal a rule can put a requirement on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSignal {
    EyeOpenness,
    MouthOpenness,
    JawDisplacement,
    /// Synthetic signal evaluated from the rolling blink window
    BlinkRate,
}

impl RuleSignal {
    /// The per-frame signal whose streaks back this requirement, if any
    pub fn signal_key(&self) -> Option<SignalKey> {
        match self {
            RuleSignal::EyeOpenness => Some(SignalKey::EyeOpenness),
            RuleSignal::MouthOpenness => Some(SignalKey::MouthOpenness),
            RuleSignal::JawDisplacement => Some(SignalKey::JawDisplacement),
            RuleSignal::BlinkRate => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSignal::EyeOpenness => "eye_openness",
            RuleSignal::MouthOpenness => "mouth_openness",
            RuleSignal::JawDisplacement => "jaw_displacement",
            RuleSignal::BlinkRate => "blink_rate",
        }
    }
}

/// Static pattern descriptor
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PatternRule {
    pub name: &'static str,
    pub description: &'static str,
    pub requires: &'static [(RuleSignal, Direction)],
    pub signal_count: usize,
}

impl PatternRule {
    pub fn confidence(&self) -> Confidence {
        Confidence::for_signal_count(self.signal_count)
    }
}

/// Every pattern the detector knows, in evaluation order
pub const PATTERN_RULES: &[PatternRule] = &[
    PatternRule {
        name: "blink_spike",
        description: "Elevated blink frequency",
        requires: &[(RuleSignal::BlinkRate, Direction::High)],
        signal_count: 1,
    },
    PatternRule {
        name: "blink_suppression",
        description: "Reduced blink frequency",
        requires: &[(RuleSignal::BlinkRate, Direction::Low)],
        signal_count: 1,
    },
    PatternRule {
        name: "eye_narrowing",
        description: "Sustained reduction in eye openness",
        requires: &[(RuleSignal::EyeOpenness, Direction::Low)],
        signal_count: 1,
    },
    PatternRule {
        name: "jaw_tension",
        description: "Sustained jaw rigidity",
        requires: &[(RuleSignal::JawDisplacement, Direction::Rigid)],
        signal_count: 1,
    },
    PatternRule {
        name: "mouth_clamp",
        description: "Sustained mouth compression",
        requires: &[(RuleSignal::MouthOpenness, Direction::Low)],
        signal_count: 1,
    },
    PatternRule {
        name: "facial_constraint",
        description: "Jaw rigidity with mouth compression",
        requires: &[
            (RuleSignal::JawDisplacement, Direction::Rigid),
            (RuleSignal::MouthOpenness, Direction::Low),
        ],
        signal_count: 2,
    },
    PatternRule {
        name: "facial_freeze",
        description: "Near-total cessation of movement across signals",
        requires: &[
            (RuleSignal::EyeOpenness, Direction::Flat),
            (RuleSignal::MouthOpenness, Direction::Flat),
            (RuleSignal::JawDisplacement, Direction::Flat),
        ],
        signal_count: 3,
    },
    PatternRule {
        name: "cognitive_load",
        description: "Blink spike with jaw tension",
        requires: &[
            (RuleSignal::BlinkRate, Direction::High),
            (RuleSignal::JawDisplacement, Direction::Rigid),
        ],
        signal_count: 2,
    },
    PatternRule {
        name: "suppression_cluster",
        description: "Eye narrowing with mouth compression",
        requires: &[
            (RuleSignal::EyeOpenness, Direction::Low),
            (RuleSignal::MouthOpenness, Direction::Low),
        ],
        signal_count: 2,
    },
    PatternRule {
        name: "arousal_spike",
        description: "Widened eyes with jaw drop",
        requires: &[
            (RuleSignal::EyeOpenness, Direction::High),
            (RuleSignal::MouthOpenness, Direction::High),
        ],
        signal_count: 2,
    },
    PatternRule {
        name: "composure_performance",
        description: "Flat signals despite high-pressure context",
        requires: &[
            (RuleSignal::EyeOpenness, Direction::Flat),
            (RuleSignal::JawDisplacement, Direction::Flat),
        ],
        signal_count: 2,
    },
];

/// Look up a rule by pattern name
pub fn find_rule(name: &str) -> Option<&'static PatternRule> {
    PATTERN_RULES.iter().find(|r| r.name == name)
}
