//! Cross-question session aggregation
//!
//! Combines the sealed question records of a whole session into recurrence
//! statistics per pattern, weights the recurring patterns by category and
//! classifies the session as sparse or as dominated by one category.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::QuestionLogEntry;

/// Minimum number of distinct questions for a pattern to be recurring
pub const MIN_QUESTION_RECURRENCE: usize = 2;

/// Sessions where at most this fraction of questions had patterns are sparse
pub const SPARSE_FRACTION: f64 = 0.25;

/// Report category a pattern belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cognitive,
    Stress,
    Control,
}

impl Category {
    /// Fixed priority order, also used to break weight ties
    pub const ALL: [Category; 3] = [Category::Cognitive, Category::Stress, Category::Control];

    pub fn patterns(&self) -> &'static [&'static str] {
        match self {
            Category::Cognitive => &["blink_spike", "blink_suppression", "cognitive_load"],
            Category::Stress => &["facial_freeze", "composure_performance", "arousal_spike"],
            Category::Control => &[
                "jaw_tension",
                "mouth_clamp",
                "facial_constraint",
                "suppression_cluster",
                "eye_narrowing",
            ],
        }
    }

    /// Category of a pattern, if it has one
    pub fn of(pattern: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.patterns().contains(&pattern))
    }

    /// Label used in narrative text
    pub fn label(&self) -> &'static str {
        match self {
            Category::Cognitive => "cognitive-load",
            Category::Stress => "stress-regulation",
            Category::Control => "response-control",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Cross-question statistics for one pattern
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatternRecurrence {
    /// Distinct questions the pattern appeared in
    pub question_count: usize,
    pub questions: Vec<i64>,
    /// Tags parallel to `questions`
    pub tags: Vec<String>,
    pub total_hits: u32,
}

impl PatternRecurrence {
    pub fn is_recurring(&self) -> bool {
        self.question_count >= MIN_QUESTION_RECURRENCE
    }
}

/// Session-level tendency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "category", rename_all = "snake_case")]
pub enum SessionClassification {
    /// Too few questions had sustained patterns to claim a tendency
    Sparse,
    /// Category with the greatest recurring weight
    Dominant(Category),
    /// Not sparse, but nothing recurred
    NoDominant,
}

/// Aggregated view of a whole session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAggregate {
    pub total_questions: usize,
    pub questions_with_patterns: usize,
    /// Every pattern seen, in first-seen order
    #[serde(with = "ordered_object")]
    pub patterns: Vec<(String, PatternRecurrence)>,
    #[serde(with = "ordered_object")]
    pub weights: Vec<(Category, usize)>,
    pub classification: SessionClassification,
}

impl SessionAggregate {
    pub fn get(&self, pattern: &str) -> Option<&PatternRecurrence> {
        self.patterns
            .iter()
            .find(|(name, _)| name == pattern)
            .map(|(_, info)| info)
    }

    /// Patterns that appeared in at least two distinct questions
    pub fn recurring(&self) -> impl Iterator<Item = (&str, &PatternRecurrence)> {
        self.patterns
            .iter()
            .filter(|(_, info)| info.is_recurring())
            .map(|(name, info)| (name.as_str(), info))
    }

    pub fn has_recurring(&self) -> bool {
        self.recurring().next().is_some()
    }

    /// Recurring patterns of a category, by question count descending
    pub fn recurring_in(&self, category: Category) -> Vec<(&str, &PatternRecurrence)> {
        let mut found: Vec<_> = self
            .recurring()
            .filter(|(name, _)| category.patterns().contains(name))
            .collect();
        found.sort_by(|a, b| b.1.question_count.cmp(&a.1.question_count));
        found
    }

    pub fn weight(&self, category: Category) -> usize {
        self.weights
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, w)| *w)
            .unwrap_or(0)
    }

    /// Sorted, de-duplicated, non-empty tags across a category's recurring patterns
    pub fn tags_in(&self, category: Category) -> Vec<&str> {
        let tags: BTreeSet<&str> = self
            .recurring_in(category)
            .into_iter()
            .flat_map(|(_, info)| info.tags.iter().map(String::as_str))
            .filter(|t| !t.is_empty())
            .collect();
        tags.into_iter().collect()
    }
}

/// Ordered key/value pairs as a JSON object, keeping insertion order
mod ordered_object {
    use std::fmt;
    use std::marker::PhantomData;

    use serde::de::{MapAccess, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, K, V>(entries: &[(K, V)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        K: Serialize,
        V: Serialize,
    {
        serializer.collect_map(entries.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D, K, V>(deserializer: D) -> Result<Vec<(K, V)>, D::Error>
    where
        D: Deserializer<'de>,
        K: Deserialize<'de>,
        V: Deserialize<'de>,
    {
        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }

    struct EntriesVisitor<K, V>(PhantomData<(K, V)>);

    impl<'de, K, V> Visitor<'de> for EntriesVisitor<K, V>
    where
        K: Deserialize<'de>,
        V: Deserialize<'de>,
    {
        type Value = Vec<(K, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a JSON object")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }
}

/// Aggregator over the full session log
pub struct SessionAggregator;

impl SessionAggregator {
    /// Build the session aggregate from every sealed question record
    pub fn aggregate(log: &[QuestionLogEntry]) -> SessionAggregate {
        let patterns = cross_question_frequency(log);

        let weights: Vec<(Category, usize)> = Category::ALL
            .into_iter()
            .map(|category| {
                let weight: usize = patterns
                    .iter()
                    .filter(|(name, info)| {
                        info.is_recurring() && category.patterns().contains(&name.as_str())
                    })
                    .map(|(_, info)| info.question_count)
                    .sum();
                (category, weight)
            })
            .collect();

        let total_questions = log.len();
        let questions_with_patterns = log.iter().filter(|e| e.has_patterns()).count();
        let classification = classify(total_questions, questions_with_patterns, &weights);

        debug!(
            total_questions,
            questions_with_patterns,
            ?classification,
            "session aggregated"
        );

        SessionAggregate {
            total_questions,
            questions_with_patterns,
            patterns,
            weights,
            classification,
        }
    }
}

/// Per pattern: distinct questions (with tags) and total hits
fn cross_question_frequency(log: &[QuestionLogEntry]) -> Vec<(String, PatternRecurrence)> {
    let mut cross: Vec<(String, PatternRecurrence)> = Vec::new();

    for entry in log {
        let mut seen_this_question: HashSet<&str> = HashSet::new();
        for p in &entry.patterns {
            let idx = match cross.iter().position(|(name, _)| *name == p.pattern) {
                Some(idx) => idx,
                None => {
                    cross.push((p.pattern.clone(), PatternRecurrence::default()));
                    cross.len() - 1
                }
            };
            let info = &mut cross[idx].1;

            if seen_this_question.insert(p.pattern.as_str()) {
                info.question_count += 1;
                info.questions.push(entry.question_id);
                info.tags.push(entry.tag.clone());
            }
            info.total_hits += p.hits;
        }
    }

    cross
}

fn classify(
    total_questions: usize,
    questions_with_patterns: usize,
    weights: &[(Category, usize)],
) -> SessionClassification {
    if questions_with_patterns as f64 <= total_questions as f64 * SPARSE_FRACTION {
        return SessionClassification::Sparse;
    }

    // strictly greater keeps the earlier category on ties
    let mut dominant: Option<(Category, usize)> = None;
    for &(category, weight) in weights {
        if weight > dominant.map(|(_, w)| w).unwrap_or(0) {
            dominant = Some((category, weight));
        }
    }

    match dominant {
        Some((category, _)) => SessionClassification::Dominant(category),
        None => SessionClassification::NoDominant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AggregatedPattern, Confidence};
    use pretty_assertions::assert_eq;

    fn pattern(name: &str, hits: u32) -> AggregatedPattern {
        AggregatedPattern {
            pattern: name.to_string(),
            confidence: crate::rules::find_rule(name)
                .map(|r| r.confidence())
                .unwrap_or(Confidence::Low),
            hits,
        }
    }

    fn entry(id: i64, tag: &str, patterns: Vec<AggregatedPattern>) -> QuestionLogEntry {
        let raw = patterns.iter().map(|p| p.hits as usize).sum();
        QuestionLogEntry::new(id, tag, raw, patterns)
    }

    #[test]
    fn test_recurrence_across_questions() {
        let log = vec![
            entry(1, "loyalty", vec![pattern("jaw_tension", 3)]),
            entry(2, "money", vec![pattern("mouth_clamp", 2)]),
            entry(3, "", vec![pattern("jaw_tension", 2)]),
            entry(4, "family", vec![pattern("jaw_tension", 4)]),
            entry(5, "loyalty", vec![]),
        ];

        let aggregate = SessionAggregator::aggregate(&log);

        let jaw = aggregate.get("jaw_tension").unwrap();
        assert_eq!(jaw.question_count, 3);
        assert_eq!(jaw.questions, vec![1, 3, 4]);
        assert_eq!(jaw.tags, vec!["loyalty", "", "family"]);
        assert_eq!(jaw.total_hits, 9);
        assert!(jaw.is_recurring());

        let clamp = aggregate.get("mouth_clamp").unwrap();
        assert_eq!(clamp.question_count, 1);
        assert!(!clamp.is_recurring());

        let recurring: Vec<&str> = aggregate.recurring().map(|(n, _)| n).collect();
        assert_eq!(recurring, vec!["jaw_tension"]);
        assert_eq!(aggregate.tags_in(Category::Control), vec!["family", "loyalty"]);
    }

    #[test]
    fn test_duplicate_pattern_in_question_counts_once() {
        let log = vec![
            entry(1, "a", vec![pattern("jaw_tension", 2), pattern("jaw_tension", 3)]),
            entry(2, "b", vec![pattern("jaw_tension", 2)]),
        ];

        let aggregate = SessionAggregator::aggregate(&log);
        let jaw = aggregate.get("jaw_tension").unwrap();
        assert_eq!(jaw.question_count, 2);
        assert_eq!(jaw.total_hits, 7);
    }

    #[test]
    fn test_category_membership() {
        assert_eq!(Category::of("cognitive_load"), Some(Category::Cognitive));
        assert_eq!(Category::of("arousal_spike"), Some(Category::Stress));
        assert_eq!(Category::of("eye_narrowing"), Some(Category::Control));
        assert_eq!(Category::of("unknown"), None);

        for rule in crate::rules::PATTERN_RULES {
            assert!(Category::of(rule.name).is_some(), "{}", rule.name);
        }
    }

    #[test]
    fn test_dominant_category() {
        let log = vec![
            entry(1, "", vec![pattern("jaw_tension", 2), pattern("blink_spike", 2)]),
            entry(2, "", vec![pattern("jaw_tension", 2), pattern("blink_spike", 2)]),
            entry(3, "", vec![pattern("mouth_clamp", 2)]),
            entry(4, "", vec![pattern("mouth_clamp", 2)]),
        ];

        let aggregate = SessionAggregator::aggregate(&log);
        assert_eq!(aggregate.weight(Category::Control), 4);
        assert_eq!(aggregate.weight(Category::Cognitive), 2);
        assert_eq!(aggregate.weight(Category::Stress), 0);
        assert_eq!(
            aggregate.classification,
            SessionClassification::Dominant(Category::Control)
        );
    }

    #[test]
    fn test_weight_tie_prefers_earlier_category() {
        let log = vec![
            entry(1, "", vec![pattern("facial_freeze", 2), pattern("jaw_tension", 2)]),
            entry(2, "", vec![pattern("facial_freeze", 2), pattern("jaw_tension", 2)]),
        ];

        let aggregate = SessionAggregator::aggregate(&log);
        assert_eq!(aggregate.weight(Category::Stress), 2);
        assert_eq!(aggregate.weight(Category::Control), 2);
        assert_eq!(
            aggregate.classification,
            SessionClassification::Dominant(Category::Stress)
        );
    }

    #[test]
    fn test_sparse_session() {
        // 1 of 4 questions with patterns is exactly 25%
        let log = vec![
            entry(1, "", vec![pattern("jaw_tension", 5)]),
            entry(2, "", vec![]),
            entry(3, "", vec![]),
            entry(4, "", vec![]),
        ];

        let aggregate = SessionAggregator::aggregate(&log);
        assert_eq!(aggregate.questions_with_patterns, 1);
        assert_eq!(aggregate.classification, SessionClassification::Sparse);
        assert_eq!(
            SessionAggregator::aggregate(&[]).classification,
            SessionClassification::Sparse
        );
    }

    #[test]
    fn test_no_recurrence_has_no_dominant() {
        let log = vec![
            entry(1, "", vec![pattern("jaw_tension", 2)]),
            entry(2, "", vec![pattern("mouth_clamp", 2)]),
        ];

        let aggregate = SessionAggregator::aggregate(&log);
        assert!(!aggregate.has_recurring());
        assert_eq!(aggregate.classification, SessionClassification::NoDominant);
    }

    #[test]
    fn test_classification_serialization() {
        let json = serde_json::to_string(&SessionClassification::Dominant(Category::Control)).unwrap();
        assert_eq!(json, r#"{"kind":"dominant","category":"control"}"#);
        let json = serde_json::to_string(&SessionClassification::Sparse).unwrap();
        assert_eq!(json, r#"{"kind":"sparse"}"#);
    }

    #[test]
    fn test_aggregate_serializes_maps_in_first_seen_order() {
        let log = vec![
            entry(1, "", vec![pattern("mouth_clamp", 2)]),
            entry(2, "", vec![pattern("jaw_tension", 2), pattern("mouth_clamp", 3)]),
        ];
        let aggregate = SessionAggregator::aggregate(&log);

        let json = serde_json::to_string(&aggregate).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["patterns"].is_object());
        assert_eq!(value["patterns"]["mouth_clamp"]["question_count"], 2);
        assert!(value["weights"]["control"].is_number());
        assert!(json.find("\"mouth_clamp\"").unwrap() < json.find("\"jaw_tension\"").unwrap());

        let restored: SessionAggregate = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, aggregate);
    }
}
