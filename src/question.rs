//! Per-question aggregation
//!
//! Deduplicates the raw detector emissions collected during one question
//! window and keeps only the patterns that were sustained across several
//! sampling calls.

use std::collections::HashMap;

use crate::types::{AggregatedPattern, Confidence, PatternSample};

/// Minimum sample hits for a pattern to count as sustained in a question
pub const MIN_SUSTAINED_HITS: u32 = 2;

/// Aggregator for a single question window
pub struct QuestionAggregator;

impl QuestionAggregator {
    /// Group samples by pattern, drop anything under the hit minimum and rank
    /// the rest by hits (descending), then confidence (medium first).
    pub fn aggregate(samples: &[PatternSample]) -> Vec<AggregatedPattern> {
        // first-seen order keeps the ranking deterministic on full ties
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, (u32, Confidence)> = HashMap::new();

        for sample in samples {
            let name = sample.pattern.as_str();
            let group = groups.entry(name).or_insert_with(|| {
                order.push(name);
                (0, sample.confidence)
            });
            group.0 += 1;
            group.1 = group.1.max(sample.confidence);
        }

        let mut result: Vec<AggregatedPattern> = order
            .into_iter()
            .filter_map(|name| {
                let (hits, confidence) = groups[name];
                (hits >= MIN_SUSTAINED_HITS).then(|| AggregatedPattern {
                    pattern: name.to_string(),
                    confidence,
                    hits,
                })
            })
            .collect();

        result.sort_by(|a, b| b.hits.cmp(&a.hits).then(b.confidence.cmp(&a.confidence)));
        result
    }
}
