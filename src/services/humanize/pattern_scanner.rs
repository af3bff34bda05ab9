// Pattern Scanner
// Sentence boundaries, signal-family hits and per-sentence semantic units.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::models::{
    Complexity, ScanResult, SemanticRole, SemanticUnit, SignalFamily, Tense, TextSpan, Voice,
};
use crate::services::detection::signals::{detect_signals, is_passive};
use crate::services::lexicon::Lexicon;
use crate::services::text_processor::{normalize_punctuation, split_paragraph_sentences, split_terminator, word_count};

const AUXILIARIES: &[&str] = &[
    "am", "is", "are", "was", "were", "be", "been", "being", "has", "have", "had", "will", "would",
    "can", "could", "shall", "should", "may", "might", "must", "do", "does", "did",
];

const PAST_AUXILIARIES: &[&str] = &["was", "were", "had", "did"];

const FUNCTION_WORDS: &[&str] = &[
    "a", "an", "the", "of", "in", "for", "with", "to", "by", "and", "or", "more", "most", "very",
    "this", "that", "these", "those", "our", "their", "its", "his", "her", "my", "your",
];

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S+").expect("token regex"))
}

fn future_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(will|shall|going\s+to)\b").expect("future regex"))
}

/// Average words per sentence: < 12 low, < 22 medium, else high
pub fn complexity_for(avg_words: f64) -> Complexity {
    if avg_words < 12.0 {
        Complexity::Low
    } else if avg_words < 22.0 {
        Complexity::Medium
    } else {
        Complexity::High
    }
}

fn bare(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
        .to_lowercase()
}

fn is_verb_like(tokens: &[String], i: usize) -> bool {
    let word = tokens[i].as_str();
    if AUXILIARIES.contains(&word) {
        return true;
    }
    if i == 0 || word.len() < 4 {
        return false;
    }
    let prev = tokens[i - 1].as_str();
    if FUNCTION_WORDS.contains(&prev) {
        return false;
    }
    if word.ends_with("ed") {
        return true;
    }
    // third-person singular: "-s" form not followed by another "-s" word
    let next_is_plural = tokens.get(i + 1).map(|n| n.ends_with('s')).unwrap_or(false);
    word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("'s")
        && !next_is_plural
}

pub struct PatternScanner {
    lexicon: Arc<Lexicon>,
}

impl PatternScanner {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    /// Segment `text` and count the signals the scorer penalises. Empty or
    /// whitespace-only text yields an empty result with low complexity.
    pub fn scan(&self, text: &str) -> ScanResult {
        let normalized = normalize_punctuation(text);
        let paragraphs = split_paragraph_sentences(&normalized);
        if paragraphs.is_empty() {
            return ScanResult::empty();
        }

        let mut sentences = Vec::new();
        let mut units = Vec::new();
        for (p_idx, paragraph) in paragraphs.into_iter().enumerate() {
            for sentence in paragraph {
                units.push(self.semantic_unit(&sentence, p_idx));
                sentences.push(sentence);
            }
        }

        let signals = detect_signals(&self.lexicon, &normalized, &sentences);
        let total_words: usize = sentences.iter().map(|s| word_count(s)).sum();
        let avg_words = total_words as f64 / sentences.len() as f64;
        let complexity_level = complexity_for(avg_words);

        debug!(
            sentences = sentences.len(),
            signals = signals.len(),
            complexity = %complexity_level,
            "[SCANNER] scan complete"
        );

        ScanResult {
            sentences,
            signals,
            complexity_level,
            units,
        }
    }

    /// Lexical approximation of subject, predicate, tense, voice and role
    pub fn semantic_unit(&self, sentence: &str, paragraph: usize) -> SemanticUnit {
        let (body, _) = split_terminator(sentence);
        let spans: Vec<(usize, usize)> = token_re()
            .find_iter(body)
            .map(|m| (m.start(), m.end()))
            .collect();
        let tokens: Vec<String> = spans.iter().map(|&(s, e)| bare(&body[s..e])).collect();

        let verb_idx = (0..tokens.len())
            .find(|&i| AUXILIARIES.contains(&tokens[i].as_str()))
            .or_else(|| (0..tokens.len()).find(|&i| is_verb_like(&tokens, i)))
            .unwrap_or(if tokens.len() > 1 { 1 } else { 0 });

        let (subject, predicate) = if spans.is_empty() {
            (TextSpan::default(), TextSpan::default())
        } else {
            let subject = if verb_idx == 0 {
                TextSpan { start: spans[0].0, end: spans[0].0 }
            } else {
                TextSpan { start: spans[0].0, end: spans[verb_idx - 1].1 }
            };
            let predicate = TextSpan {
                start: spans[verb_idx].0,
                end: spans[spans.len() - 1].1,
            };
            (subject, predicate)
        };

        let voice = if is_passive(sentence) { Voice::Passive } else { Voice::Active };
        let tense = if future_re().is_match(body) {
            Tense::Future
        } else if tokens.iter().any(|t| PAST_AUXILIARIES.contains(&t.as_str()))
            || tokens.get(verb_idx).map(|t| t.ends_with("ed")).unwrap_or(false)
        {
            Tense::Past
        } else {
            Tense::Present
        };

        SemanticUnit {
            text: sentence.to_string(),
            paragraph,
            subject,
            predicate,
            tense,
            voice,
            role: self.role_of(sentence),
        }
    }

    fn role_of(&self, sentence: &str) -> SemanticRole {
        let trimmed = sentence.trim_end();
        if trimmed.ends_with('?') {
            return SemanticRole::Question;
        }
        if trimmed.ends_with('!') {
            return SemanticRole::Exclamation;
        }
        let start = sentence.trim_start_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
        let opens_with_transition = self
            .lexicon
            .family_patterns(SignalFamily::FormulaicTransitions)
            .iter()
            .any(|re| re.find(start).map(|m| m.start() == 0).unwrap_or(false));
        if opens_with_transition {
            SemanticRole::Transition
        } else {
            SemanticRole::Statement
        }
    }
}
