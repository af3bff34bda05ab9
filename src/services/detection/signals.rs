// Signal family matchers
// Counting is shared by PatternScanner (what to rewrite) and DetectionScorer (how AI-like it reads).

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{SignalFamily, SignalHit};
use crate::services::lexicon::Lexicon;

/// Families whose evidence is counted as match occurrences
pub const LEXICAL_FAMILIES: [SignalFamily; 4] = [
    SignalFamily::FormulaicTransitions,
    SignalFamily::Hedging,
    SignalFamily::StatisticalTemplates,
    SignalFamily::AiVocabulary,
];

pub fn passive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(am|is|are|was|were|be|been|being)\s+(?:\w+ly\s+)?(\w+ed|known|shown|seen|given|taken|made|done|written|built|found|held|kept|led|told|thought|brought|chosen|driven|grown|drawn|spoken)\b",
        )
        .expect("passive regex")
    })
}

/// Number of matches of a lexical family in `text`
pub fn count_family(lexicon: &Lexicon, family: SignalFamily, text: &str) -> usize {
    lexicon
        .family_patterns(family)
        .iter()
        .map(|re| re.find_iter(text).count())
        .sum()
}

pub fn is_passive(sentence: &str) -> bool {
    passive_re().is_match(sentence)
}

pub fn passive_sentence_count(sentences: &[String]) -> usize {
    sentences.iter().filter(|s| is_passive(s)).count()
}

/// Non-zero hits for every lexical family plus passive voice
pub fn detect_signals(lexicon: &Lexicon, text: &str, sentences: &[String]) -> Vec<SignalHit> {
    let mut hits: Vec<SignalHit> = LEXICAL_FAMILIES
        .iter()
        .map(|&family| SignalHit {
            family,
            match_count: count_family(lexicon, family, text),
        })
        .collect();
    hits.push(SignalHit {
        family: SignalFamily::PassiveVoice,
        match_count: passive_sentence_count(sentences),
    });
    hits.retain(|h| h.match_count > 0);
    hits.sort_by_key(|h| h.family);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passive_detection() {
        assert!(is_passive("The report was written by the team."));
        assert!(is_passive("Results were carefully collected."));
        assert!(!is_passive("The team wrote the report."));
    }

    #[test]
    fn test_scenario_signals() {
        let lexicon = Lexicon::builtin();
        let text = "In conclusion, the implementation of advanced methodologies demonstrates significant improvements.";
        let hits = detect_signals(&lexicon, text, &[text.to_string()]);
        let count = |family| hits.iter().find(|h| h.family == family).map(|h| h.match_count).unwrap_or(0);

        assert_eq!(count(SignalFamily::FormulaicTransitions), 1);
        assert_eq!(count(SignalFamily::StatisticalTemplates), 3);
        assert_eq!(count(SignalFamily::AiVocabulary), 4);
        assert_eq!(count(SignalFamily::Hedging), 0);
        assert!(hits.iter().all(|h| h.match_count > 0));
    }

    #[test]
    fn test_plain_text_has_no_signals() {
        let lexicon = Lexicon::builtin();
        let text = "We grabbed tacos after the game and argued about the referee.";
        assert!(detect_signals(&lexicon, text, &[text.to_string()]).is_empty());
    }
}
