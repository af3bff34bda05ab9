// Human Verifier
// Smooths artefacts left by earlier stages, then seeds calibrated human slips
// (typos, agreement slips, punctuation quirks) at the configured error level.

use regex::{Captures, Regex};
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::models::ErrorLevel;
use crate::services::error::{ensure_non_empty, HumanizeError};
use crate::services::lexicon::Lexicon;
use crate::services::randomness::{pick, RandomSource};
use crate::services::text_processor::{apply_phrase_rules, capitalize_first, join_paragraphs, split_paragraph_sentences};

const STAGE: &str = "human_verifier";

const TYPO_GATE: f64 = 0.9;
const GRAMMAR_GATE: f64 = 0.6;
const PUNCTUATION_GATE: f64 = 0.7;

// Legitimate English doublings
const ALLOWED_DOUBLES: &[&str] = &["had", "that"];

fn regex(cell: &'static OnceLock<Regex>, src: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(src).expect("verifier regex"))
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\S+")
}

fn opener_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^([A-Z][A-Za-z']*(?:\s+[a-z']+){0,3}),\s+")
}

fn past_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i)\b(?:yesterday|last\s+(?:week|month|year|night)|ago)\b")
}

fn present_be_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\b(is|are)\b")
}

fn eligible_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\b[a-z]{4,}\b")
}

fn comma_before_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r", ([A-Za-z])")
}

fn contraction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\b([a-z]+)'(t|s|re|ve|ll|d|m)\b")
}

fn is_plain_word(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_alphabetic())
}

/// Drop the second of two identical adjacent words ("the the", "was was").
/// Tokens carrying digits are never touched; trailing punctuation survives.
pub fn remove_duplicate_words(text: &str) -> String {
    let spans: Vec<(usize, usize)> = token_re().find_iter(text).map(|m| (m.start(), m.end())).collect();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;

    for (i, &(start, end)) in spans.iter().enumerate() {
        if i > 0 {
            let prev = &text[spans[i - 1].0..spans[i - 1].1];
            let token = &text[start..end];
            let core = token.trim_end_matches(|c: char| !c.is_alphanumeric());
            if is_plain_word(prev)
                && is_plain_word(core)
                && prev.eq_ignore_ascii_case(core)
                && !ALLOWED_DOUBLES.contains(&core.to_lowercase().as_str())
            {
                cursor = start + core.len();
                continue;
            }
        }
        out.push_str(&text[cursor..end]);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Within a paragraph, strip an opener that repeats the previous sentence's
/// opener ("Plus, ... Plus, ...")
fn smooth_openers(sentences: Vec<String>) -> Vec<String> {
    let mut previous: Option<String> = None;
    let mut out = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        let opener = opener_re()
            .captures(&sentence)
            .and_then(|caps| caps.get(0).zip(caps.get(1)))
            .map(|(whole, word)| (whole.end(), word.as_str().to_lowercase()));
        match opener {
            Some((cut, word)) if previous.as_deref() == Some(word.as_str()) && !sentence[cut..].trim().is_empty() => {
                out.push(capitalize_first(&sentence[cut..]));
                previous = None;
            }
            Some((_, word)) => {
                previous = Some(word);
                out.push(sentence);
            }
            None => {
                previous = None;
                out.push(sentence);
            }
        }
    }
    out
}

/// Sentences anchored in the past ("yesterday", "last week", "ago") take
/// past-tense `be`
fn harmonize_tense(sentence: &str) -> String {
    if !past_marker_re().is_match(sentence) {
        return sentence.to_string();
    }
    present_be_re()
        .replace_all(sentence, |caps: &Captures| if &caps[1] == "is" { "was" } else { "were" })
        .into_owned()
}

/// Deterministic clean-up run before any noise is injected
pub fn smooth(text: &str) -> String {
    let deduped = remove_duplicate_words(text);
    let paragraphs: Vec<Vec<String>> = split_paragraph_sentences(&deduped)
        .into_iter()
        .map(|sentences| {
            smooth_openers(sentences)
                .into_iter()
                .map(|s| harmonize_tense(&s))
                .collect()
        })
        .collect();
    join_paragraphs(&paragraphs)
}

fn swap_interior(word: &str, rng: &mut dyn RandomSource) -> String {
    let mut chars: Vec<char> = word.chars().collect();
    if chars.len() < 4 {
        return word.to_string();
    }
    let i = 1 + rng.index(chars.len() - 3);
    chars.swap(i, i + 1);
    chars.into_iter().collect()
}

fn touches_protected(text: &str, start: usize, end: usize) -> bool {
    let protected = |c: char| matches!(c, '\'' | '\u{2019}' | '@' | '/' | '_' | '-');
    text[..start].chars().last().map(protected).unwrap_or(false)
        || text[end..].chars().next().map(protected).unwrap_or(false)
}

#[derive(Debug, Default, Clone, Copy)]
struct NoiseCounts {
    typos: usize,
    slips: usize,
    punctuation: usize,
}

pub struct HumanVerifier {
    lexicon: Arc<Lexicon>,
}

impl HumanVerifier {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    /// Smooth the text, then inject noise. Each category opens behind its own
    /// gate draw; inside an open category every eligible site is hit with
    /// the per-token rate of `error_level`. Capitalised words and anything
    /// containing digits are never perturbed.
    pub fn verify(
        &self,
        text: &str,
        error_level: ErrorLevel,
        rng: &mut dyn RandomSource,
    ) -> Result<String, HumanizeError> {
        let smoothed = smooth(text);
        let rate = error_level.token_rate();
        if rate <= 0.0 {
            return ensure_non_empty(STAGE, text, smoothed);
        }

        let mut counts = NoiseCounts::default();
        let mut out = smoothed;
        if rng.chance(TYPO_GATE) {
            out = self.inject_typos(&out, rate, rng, &mut counts);
        }
        if rng.chance(GRAMMAR_GATE) {
            let (slipped, n) = apply_phrase_rules(&out, &self.lexicon.grammar_slips, rate, rng, true);
            out = slipped;
            counts.slips = n;
        }
        if rng.chance(PUNCTUATION_GATE) {
            out = inject_punctuation_quirks(&out, rate, rng, &mut counts);
        }

        debug!(
            level = %error_level,
            typos = counts.typos,
            slips = counts.slips,
            punctuation = counts.punctuation,
            "[VERIFIER] noise injected"
        );
        ensure_non_empty(STAGE, text, out)
    }

    fn inject_typos(&self, text: &str, rate: f64, rng: &mut dyn RandomSource, counts: &mut NoiseCounts) -> String {
        eligible_word_re()
            .replace_all(text, |caps: &Captures| {
                let Some(m) = caps.get(0) else {
                    return String::new();
                };
                let word = m.as_str();
                if touches_protected(text, m.start(), m.end()) || !rng.chance(rate) {
                    return word.to_string();
                }
                counts.typos += 1;
                let known = self.lexicon.typos.iter().find(|rule| rule.phrase == word);
                match known.and_then(|rule| pick(rng, &rule.alternatives)) {
                    Some(typo) => typo.clone(),
                    None => swap_interior(word, rng),
                }
            })
            .into_owned()
    }
}

fn inject_punctuation_quirks(text: &str, rate: f64, rng: &mut dyn RandomSource, counts: &mut NoiseCounts) -> String {
    let without_commas = comma_before_word_re()
        .replace_all(text, |caps: &Captures| {
            if rng.chance(rate) {
                counts.punctuation += 1;
                format!(" {}", &caps[1])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned();
    contraction_re()
        .replace_all(&without_commas, |caps: &Captures| {
            if rng.chance(rate) {
                counts.punctuation += 1;
                format!("{}{}", &caps[1], &caps[2])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::randomness::{SeededRandom, SequenceRandom};

    fn verifier() -> HumanVerifier {
        HumanVerifier::new(Lexicon::builtin())
    }

    #[test]
    fn test_duplicate_words_removed() {
        assert_eq!(
            remove_duplicate_words("We fixed the the bug. The team was was happy."),
            "We fixed the bug. The team was happy."
        );
        assert_eq!(remove_duplicate_words("It is is."), "It is.");
        assert_eq!(remove_duplicate_words("He had had enough."), "He had had enough.");
        assert_eq!(remove_duplicate_words("Rooms 12 12 stay."), "Rooms 12 12 stay.");
    }

    #[test]
    fn test_repeated_opener_stripped() {
        assert_eq!(smooth("Plus, we shipped. Plus, it worked."), "Plus, we shipped. It worked.");
        assert_eq!(smooth("Plus, we shipped. Still, it worked."), "Plus, we shipped. Still, it worked.");
    }

    #[test]
    fn test_past_markers_harmonize_tense() {
        assert_eq!(
            smooth("Yesterday the office is closed and the staff are home."),
            "Yesterday the office was closed and the staff were home."
        );
        assert_eq!(smooth("The office is closed."), "The office is closed.");
    }

    #[test]
    fn test_none_level_only_smooths() {
        let text = "Because their receipt is definitely here, isn't it?";
        let out = verifier().verify(text, ErrorLevel::None, &mut SequenceRandom::always()).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn test_typos_use_table_then_letter_swap() {
        let out = verifier()
            .verify("We definitely went there.", ErrorLevel::High, &mut SequenceRandom::always())
            .unwrap();
        assert_eq!(out, "We definately wnet tehre.");
    }

    #[test]
    fn test_punctuation_quirks_only() {
        // typo and grammar gates stay closed, punctuation opens
        let mut rng = SequenceRandom::new(vec![0.95, 0.95, 0.0, 0.0, 0.0]);
        let out = verifier().verify("Well, we can't stay.", ErrorLevel::High, &mut rng).unwrap();
        assert_eq!(out, "Well we cant stay.");
    }

    #[test]
    fn test_facts_and_names_untouched() {
        let text = "Sarah Jones paid 1,200 dollars on 5/3/2024 with Acme Corp.";
        let out = verifier().verify(text, ErrorLevel::High, &mut SequenceRandom::always()).unwrap();
        for fact in ["Sarah Jones", "1,200", "5/3/2024", "Acme Corp"] {
            assert!(out.contains(fact), "{} missing from {}", fact, out);
        }
        assert!(!out.contains("dollars"));
    }

    #[test]
    fn test_output_never_empty() {
        let text = "The the quick fox. Yesterday we are late, aren't we?";
        for seed in 0..30 {
            for level in [ErrorLevel::None, ErrorLevel::Minimal, ErrorLevel::High] {
                let out = verifier().verify(text, level, &mut SeededRandom::new(seed)).unwrap();
                assert!(!out.trim().is_empty());
            }
        }
    }
}
