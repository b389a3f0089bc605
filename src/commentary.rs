//! Per-question commentary
//!
//! Picks observation text for the top aggregated patterns of a question from a
//! caller-supplied phrase bank. Phrase usage is tracked in a caller-owned
//! `CommentaryContext` so the caller avoids repeating itself.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::types::{AggregatedPattern, Commentary, Confidence};

/// Default number of patterns commented on per question
pub const DEFAULT_MAX_COMMENTARY: usize = 3;

/// Observation used when a question produced no sustained patterns
pub const NULL_OBSERVATION: &str =
    "No sustained facial patterns were detected during the response window.";

/// Phrases per confidence level for one pattern
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternPhrases {
    #[serde(default)]
    pub low: Vec<Commentary>,
    #[serde(default)]
    pub medium: Vec<Commentary>,
}

impl PatternPhrases {
    fn for_confidence(&self, confidence: Confidence) -> &[Commentary] {
        match confidence {
            Confidence::Low => &self.low,
            Confidence::Medium => &self.medium,
        }
    }
}

/// Observation/interpretation phrases keyed by pattern name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhraseBank {
    pub patterns: HashMap<String, PatternPhrases>,
}

impl PhraseBank {
    /// Load a phrase bank from JSON
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Caller-owned record of phrases already used
#[derive(Debug, Clone, Default)]
pub struct CommentaryContext {
    used: HashMap<(String, Confidence), Vec<usize>>,
}

impl CommentaryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next phrase for a pattern, preferring ones not used yet
    pub fn pick(
        &mut self,
        bank: &PhraseBank,
        pattern: &str,
        confidence: Confidence,
    ) -> Option<Commentary> {
        let phrases = bank.patterns.get(pattern)?;
        let mut entries = phrases.for_confidence(confidence);
        if entries.is_empty() {
            entries = phrases.low.as_slice();
        }
        if entries.is_empty() {
            return None;
        }

        let used = self
            .used
            .entry((pattern.to_string(), confidence))
            .or_default();
        let next = match (0..entries.len()).find(|i| !used.contains(i)) {
            Some(idx) => idx,
            None => {
                used.clear();
                0
            }
        };
        used.push(next);

        Some(entries[next].clone())
    }

    /// Commentary for the top patterns of one question
    pub fn question_commentary(
        &mut self,
        bank: &PhraseBank,
        patterns: &[AggregatedPattern],
        max_observations: usize,
    ) -> Vec<Commentary> {
        let results: Vec<Commentary> = patterns
            .iter()
            .take(max_observations)
            .filter_map(|p| self.pick(bank, &p.pattern, p.confidence))
            .collect();

        if results.is_empty() {
            vec![null_commentary()]
        } else {
            results
        }
    }
}

fn null_commentary() -> Commentary {
    Commentary {
        observation: NULL_OBSERVATION.to_string(),
        interpretation: String::new(),
    }
}

/// Render commentary as indented console lines
pub fn format_commentary(commentary: &[Commentary]) -> String {
    let mut lines = Vec::new();
    for c in commentary {
        lines.push(format!("  {}", c.observation));
        if !c.interpretation.is_empty() {
            lines.push(format!("  {}", c.interpretation));
        }
        lines.push(String::new());
    }
    lines.join("\n").trim_end().to_string()
}
