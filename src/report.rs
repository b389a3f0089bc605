//! Case-file rendering
//!
//! Renders a plain-text case file from a session aggregate. Output is fully
//! determined by the aggregate and the generation timestamp.

use chrono::{DateTime, Utc};

use crate::pipeline::SessionReport;
use crate::session::{Category, PatternRecurrence, SessionAggregate, SessionClassification};

const BANNER_WIDTH: usize = 50;
const RULE_WIDTH: usize = 40;

/// Renderer for the session case file
pub struct CaseFileRenderer;

impl CaseFileRenderer {
    /// Render the case file for a finished session
    pub fn render_report(report: &SessionReport) -> String {
        Self::render(&report.aggregate, report.generated_at)
    }

    /// Render the case file for an aggregate
    pub fn render(aggregate: &SessionAggregate, generated_at: DateTime<Utc>) -> String {
        let banner = "=".repeat(BANNER_WIDTH);

        let sections = [
            [
                banner.clone(),
                "  NO ALIBI — CASE FILE".to_string(),
                format!("  Generated: {}", generated_at.format("%Y-%m-%d %H:%M")),
                banner.clone(),
                String::new(),
            ]
            .join("\n"),
            overview(aggregate),
            String::new(),
            category_section(aggregate, Category::Cognitive),
            String::new(),
            category_section(aggregate, Category::Stress),
            String::new(),
            category_section(aggregate, Category::Control),
            String::new(),
            behavioral_summary(aggregate),
            String::new(),
            closing_note(),
            String::new(),
            banner.clone(),
            "  END OF CASE FILE".to_string(),
            banner,
        ];

        sections.join("\n")
    }
}

fn heading(title: &str) -> Vec<String> {
    vec![title.to_string(), "-".repeat(RULE_WIDTH)]
}

fn overview(aggregate: &SessionAggregate) -> String {
    let mut lines = heading("OVERVIEW");

    if aggregate.questions_with_patterns == 0 {
        lines.push("No sustained facial patterns were detected across the session.".to_string());
        lines.push(
            "The subject maintained a baseline-consistent presentation throughout.".to_string(),
        );
        return lines.join("\n");
    }

    lines.push(format!(
        "Across {} questions, sustained facial patterns were observed in {}.",
        aggregate.total_questions, aggregate.questions_with_patterns
    ));

    let recurring = aggregate.recurring().count();
    if recurring > 0 {
        lines.push(format!(
            "Of those, {} pattern type{} recurred across multiple questions.",
            recurring,
            if recurring != 1 { "s" } else { "" }
        ));
    } else {
        lines.push("No pattern type recurred across multiple questions.".to_string());
        lines.push(
            "Observed signals were isolated and do not form a cross-session tendency.".to_string(),
        );
    }

    lines.join("\n")
}

fn section_title(category: Category) -> &'static str {
    match category {
        Category::Cognitive => "COGNITIVE STYLE",
        Category::Stress => "STRESS REGULATION",
        Category::Control => "RESPONSE CONTROL",
    }
}

fn tag_lead(category: Category) -> &'static str {
    match category {
        Category::Cognitive => "These patterns were concentrated in questions tagged",
        Category::Stress => "These patterns surfaced during questions tagged",
        Category::Control => "These patterns were observed during questions tagged",
    }
}

fn category_section(aggregate: &SessionAggregate, category: Category) -> String {
    let mut lines = heading(section_title(category));

    let found = aggregate.recurring_in(category);
    if found.is_empty() {
        lines.push(format!(
            "No recurring {} {} were observed across the session.",
            category.label(),
            match category {
                Category::Cognitive => "indicators",
                _ => "patterns",
            }
        ));
        return lines.join("\n");
    }

    lines.extend(
        found
            .iter()
            .filter_map(|(name, info)| recurrence_finding(name, info)),
    );

    let tags = aggregate.tags_in(category);
    if !tags.is_empty() {
        lines.push(format!("{}: {}.", tag_lead(category), tags.join(", ")));
    }

    lines.join("\n")
}

/// Narrative line for one recurring pattern
fn recurrence_finding(pattern: &str, info: &PatternRecurrence) -> Option<String> {
    let n = info.question_count;
    let text = match pattern {
        "blink_spike" => format!(
            "A recurring elevation in blink rate above baseline was observed across {n} questions. \
             This may indicate a tendency toward elevated processing demand when formulating responses."
        ),
        "blink_suppression" => format!(
            "Blink suppression below baseline recurred across {n} questions. \
             This may indicate a pattern of attentional narrowing during response windows."
        ),
        "cognitive_load" => format!(
            "Co-occurring blink elevation and jaw rigidity were observed across {n} questions. \
             This may indicate sustained processing demand paired with physical containment."
        ),
        "facial_freeze" => format!(
            "Near-total cessation of facial movement was observed across {n} questions. \
             This may indicate a recurring freeze-adjacent response under questioning pressure."
        ),
        "composure_performance" => format!(
            "Unusually narrow signal variance near baseline was observed across {n} questions. \
             This may indicate active composure maintenance. Whether natural or performed is not determinable."
        ),
        "arousal_spike" => format!(
            "Simultaneous above-baseline elevation of eye and mouth aperture recurred across {n} questions. \
             This may indicate a pattern of unregulated initial response prior to correction."
        ),
        "jaw_tension" => format!(
            "Jaw rigidity below baseline movement range recurred across {n} questions. \
             This may indicate a tendency toward physical containment during response formulation."
        ),
        "mouth_clamp" => format!(
            "Mouth compression below baseline recurred across {n} questions. \
             This may indicate a pattern of suppressing initial verbal responses before speaking."
        ),
        "facial_constraint" => format!(
            "Co-occurring jaw rigidity and mouth compression were observed across {n} questions. \
             This may indicate coordinated physical restraint of facial output."
        ),
        "suppression_cluster" => format!(
            "Simultaneous reduction in eye openness and mouth aperture recurred across {n} questions. \
             This may indicate multi-region facial containment as a recurring response pattern."
        ),
        "eye_narrowing" => format!(
            "Sustained reduction in eye aperture below baseline recurred across {n} questions. \
             This may indicate a tendency toward evaluative narrowing during questioning."
        ),
        _ => return None,
    };
    Some(text)
}

fn summary_phrase(category: Category) -> &'static str {
    match category {
        Category::Cognitive => "processing-load indicators",
        Category::Stress => "stress-regulation signals",
        Category::Control => "response-control behaviors",
    }
}

fn behavioral_summary(aggregate: &SessionAggregate) -> String {
    let mut lines = heading("BEHAVIORAL SUMMARY");

    if !aggregate.has_recurring() {
        lines.push(
            "The subject did not exhibit recurring facial patterns across the session. \
             Observed signals were either absent or isolated to individual questions. \
             No cross-session behavioral tendency can be identified from this data."
                .to_string(),
        );
        return lines.join("\n");
    }

    if aggregate.classification == SessionClassification::Sparse {
        lines.push(
            "Across the session, observable patterns were sparse. \
             The subject presented with minimal sustained deviation from baseline. \
             This absence itself is a data point, though its meaning is not determinable from observation alone."
                .to_string(),
        );
        return lines.join("\n");
    }

    let segments: Vec<&str> = Category::ALL
        .into_iter()
        .filter(|c| aggregate.weight(*c) > 0)
        .map(summary_phrase)
        .collect();

    if let Some((last, rest)) = segments.split_last() {
        let joined = if rest.is_empty() {
            last.to_string()
        } else {
            format!("{}, and {}", rest.join(", "), last)
        };
        lines.push(format!(
            "The session produced recurring {}. \
             Taken together, these patterns suggest a subject who engages in measurable \
             facial adjustment during morally loaded questioning.",
            joined
        ));
    }

    if let SessionClassification::Dominant(category) = aggregate.classification {
        lines.push(format!(
            "The most recurrent tendency fell in the {} category. \
             This does not imply a cause or a character trait. It is a pattern, observed and recorded.",
            category.label()
        ));
    }

    lines.join("\n")
}

fn closing_note() -> String {
    let mut lines = heading("CLOSING NOTE");
    lines.push(
        "This case file was generated from observable facial patterns during a simulated interrogation. \
         It is not a psychological assessment, a lie detection report, or a diagnostic instrument."
            .to_string(),
    );
    lines.push(String::new());
    lines.push(
        "All observations are relative to an individual baseline established at the start of the session. \
         The system does not know what the subject was thinking, feeling, or intending. \
         It records deviations. It does not explain them."
            .to_string(),
    );
    lines.push(String::new());
    lines.push(
        "Patterns that appeared in isolation were excluded. \
         Patterns that recurred were noted. \
         Recurrence does not establish meaning."
            .to_string(),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionAggregator;
    use crate::types::{AggregatedPattern, Confidence, QuestionLogEntry};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn entry(id: i64, tag: &str, patterns: &[&str]) -> QuestionLogEntry {
        let patterns = patterns
            .iter()
            .map(|p| AggregatedPattern {
                pattern: p.to_string(),
                confidence: Confidence::Low,
                hits: 2,
            })
            .collect();
        QuestionLogEntry::new(id, tag, 4, patterns)
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 0).unwrap()
    }

    fn section<'a>(text: &'a str, title: &str) -> &'a str {
        let start = text.find(title).unwrap();
        let rest = &text[start..];
        let end = rest.find("\n\n").unwrap_or(rest.len());
        &rest[..end]
    }

    #[test]
    fn test_header_and_footer() {
        let aggregate = SessionAggregator::aggregate(&[]);
        let text = CaseFileRenderer::render(&aggregate, at());

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=".repeat(50));
        assert_eq!(lines[1], "  NO ALIBI — CASE FILE");
        assert_eq!(lines[2], "  Generated: 2026-03-14 09:26");
        assert_eq!(lines[lines.len() - 2], "  END OF CASE FILE");
    }

    #[test]
    fn test_quiet_session() {
        let log = vec![entry(1, "", &[]), entry(2, "", &[])];
        let text = CaseFileRenderer::render(&SessionAggregator::aggregate(&log), at());

        assert_eq!(
            section(&text, "OVERVIEW"),
            "OVERVIEW\n----------------------------------------\n\
             No sustained facial patterns were detected across the session.\n\
             The subject maintained a baseline-consistent presentation throughout."
        );
        assert!(section(&text, "COGNITIVE STYLE")
            .contains("No recurring cognitive-load indicators were observed across the session."));
        assert!(section(&text, "STRESS REGULATION")
            .contains("No recurring stress-regulation patterns were observed across the session."));
        assert!(section(&text, "BEHAVIORAL SUMMARY")
            .contains("did not exhibit recurring facial patterns"));
    }

    #[test]
    fn test_control_session() {
        let log = vec![
            entry(1, "loyalty", &["jaw_tension", "blink_suppression"]),
            entry(2, "", &["mouth_clamp"]),
            entry(3, "money", &["jaw_tension", "blink_suppression"]),
            entry(4, "loyalty", &["jaw_tension"]),
        ];
        let text = CaseFileRenderer::render(&SessionAggregator::aggregate(&log), at());

        assert!(section(&text, "OVERVIEW").contains(
            "Across 4 questions, sustained facial patterns were observed in 4.\n\
             Of those, 2 pattern types recurred across multiple questions."
        ));

        let control = section(&text, "RESPONSE CONTROL");
        assert!(control.contains("Jaw rigidity below baseline movement range recurred across 3 questions."));
        assert!(!control.contains("Mouth compression"));
        assert!(control.ends_with(
            "These patterns were observed during questions tagged: loyalty, money."
        ));

        let summary = section(&text, "BEHAVIORAL SUMMARY");
        assert!(summary.contains(
            "The session produced recurring processing-load indicators, and response-control behaviors."
        ));
        assert!(summary.contains("fell in the response-control category."));
    }

    #[test]
    fn test_sparse_session() {
        let mut log = vec![entry(1, "", &["facial_freeze"]), entry(2, "", &["facial_freeze"])];
        for id in 3..=8 {
            log.push(entry(id, "", &[]));
        }
        let text = CaseFileRenderer::render(&SessionAggregator::aggregate(&log), at());

        let summary = section(&text, "BEHAVIORAL SUMMARY");
        assert!(summary.contains("observable patterns were sparse"));
        assert!(!summary.contains("most recurrent tendency"));
        assert!(section(&text, "STRESS REGULATION")
            .contains("Near-total cessation of facial movement was observed across 2 questions."));
    }

    #[test]
    fn test_isolated_patterns_only() {
        let log = vec![entry(1, "", &["eye_narrowing"]), entry(2, "", &["arousal_spike"])];
        let text = CaseFileRenderer::render(&SessionAggregator::aggregate(&log), at());

        assert!(section(&text, "OVERVIEW")
            .contains("No pattern type recurred across multiple questions."));
    }
}
