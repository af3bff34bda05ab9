// Fact Guard
// Extracts literals that must survive rewriting (dates, numbers, named entities)
// and checks that they are still present afterwards.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::warn;

use crate::models::{FactKind, FactRecord};
use crate::services::text_processor::is_sentence_start;

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let month = r"(?:January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)";
        Regex::new(&format!(
            r"\b\d{{4}}-\d{{1,2}}-\d{{1,2}}\b|\b\d{{1,2}}[/.\-]\d{{1,2}}[/.\-]\d{{2,4}}\b|\b{m}\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}\b|\b\d{{1,2}}(?:st|nd|rd|th)?\s+{m}\s+\d{{4}}\b",
            m = month
        ))
        .expect("date regex")
    })
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b\d{1,3}(?:,\d{3})+(?:\.\d+)?%?|\b\d+(?:\.\d+)?%?").expect("number regex")
    })
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Z][a-zA-Z'\-]+(?:[ \t]+[A-Z][a-zA-Z'\-]+)+").expect("entity regex")
    })
}

/// Blank out matched spans so later patterns cannot match inside them
fn mask(text: &str, re: &Regex) -> String {
    re.replace_all(text, |caps: &regex::Captures| " ".repeat(caps[0].len()))
        .into_owned()
}

/// Collect protected literals from `text`. Deterministic: dates first, then
/// numbers outside dates, then capitalised multi-word sequences that do not
/// open a sentence. Duplicates are dropped, first occurrence wins.
pub fn extract(text: &str) -> Vec<FactRecord> {
    let mut facts = Vec::new();
    let mut seen: HashSet<(FactKind, String)> = HashSet::new();
    let mut push = |kind: FactKind, value: &str| {
        let value = value.trim().trim_end_matches(',').to_string();
        if value.is_empty() {
            return;
        }
        if seen.insert((kind, value.clone())) {
            facts.push(FactRecord { kind, value });
        }
    };

    for m in date_re().find_iter(text) {
        push(FactKind::Date, m.as_str());
    }

    let without_dates = mask(text, date_re());
    for m in number_re().find_iter(&without_dates) {
        push(FactKind::Number, m.as_str());
    }

    for m in entity_re().find_iter(text) {
        let value = m.as_str();
        if !is_sentence_start(text, m.start()) {
            push(FactKind::Entity, value);
            continue;
        }
        // Drop the sentence-initial word; keep the rest if it is still multi-word
        let rest = value
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim_start())
            .unwrap_or("");
        if rest.split_whitespace().count() >= 2 {
            push(FactKind::Entity, rest);
        }
    }

    facts
}

/// Outcome of checking facts against rewritten text
#[derive(Debug, Clone, PartialEq)]
pub struct Reinjection {
    pub text: String,
    /// Values not found (case-insensitive) in `text`
    pub missing: Vec<String>,
}

/// Check every fact for textual presence. Missing facts are logged and
/// reported; the text itself is returned unchanged.
pub fn reinject(text: &str, facts: &[FactRecord]) -> Reinjection {
    let haystack = text.to_lowercase();
    let mut missing = Vec::new();
    for fact in facts {
        if !haystack.contains(&fact.value.to_lowercase()) {
            warn!(
                kind = ?fact.kind,
                value = %fact.value,
                "[FACT_GUARD] fact missing after rewrite"
            );
            missing.push(fact.value.clone());
        }
    }
    Reinjection {
        text: text.to_string(),
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(facts: &[FactRecord], kind: FactKind) -> Vec<String> {
        facts.iter().filter(|f| f.kind == kind).map(|f| f.value.clone()).collect()
    }

    #[test]
    fn test_extract_meeting_facts() {
        let facts = extract("The meeting is on 5/3/2024 with 1,200 attendees.");
        assert_eq!(values(&facts, FactKind::Date), vec!["5/3/2024"]);
        assert_eq!(values(&facts, FactKind::Number), vec!["1,200"]);
        assert!(values(&facts, FactKind::Entity).is_empty());
    }

    #[test]
    fn test_extract_dates_in_several_shapes() {
        let facts = extract("Launch moved from 2024-01-15 to March 3, 2025, then to 4 June 2025.");
        assert_eq!(
            values(&facts, FactKind::Date),
            vec!["2024-01-15", "March 3, 2025", "4 June 2025"]
        );
        assert!(values(&facts, FactKind::Number).is_empty());
    }

    #[test]
    fn test_extract_numbers_and_percentages() {
        let facts = extract("Revenue grew 12.5% to 3,400,000 units over 18 months.");
        assert_eq!(values(&facts, FactKind::Number), vec!["12.5%", "3,400,000", "18"]);
    }

    #[test]
    fn test_entities_skip_sentence_start() {
        let facts = extract("Yesterday the Advanced Robotics Lab met. New York Times readers agreed.");
        let entities = values(&facts, FactKind::Entity);
        assert!(entities.contains(&"Advanced Robotics Lab".to_string()));
        assert!(entities.contains(&"York Times".to_string()));
        assert!(!entities.iter().any(|e| e.starts_with("New ")));
    }

    #[test]
    fn test_extract_is_deterministic_and_deduplicated() {
        let text = "Sales hit 1,200 on 5/3/2024 and again 1,200 later.";
        let a = extract(text);
        assert_eq!(a, extract(text));
        assert_eq!(values(&a, FactKind::Number), vec!["1,200"]);
    }

    #[test]
    fn test_extract_empty() {
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_reinject_reports_missing_without_rewriting() {
        let facts = extract("The meeting is on 5/3/2024 with 1,200 attendees.");
        let present = reinject("so the MEETING on 5/3/2024 had 1,200 folks.", &facts);
        assert!(present.missing.is_empty());

        let lost = reinject("The meeting had lots of people.", &facts);
        assert_eq!(lost.text, "The meeting had lots of people.");
        assert_eq!(lost.missing, vec!["5/3/2024".to_string(), "1,200".to_string()]);
    }
}
