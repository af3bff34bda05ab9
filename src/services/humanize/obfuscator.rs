// Obfuscator
// Ordered battery of surface perturbations aimed at n-gram and fingerprint detectors.
// Pass order is fixed: later passes rely on the delimiter shape left by earlier
// ones, and final cleanup always runs last.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::services::error::{ensure_non_empty, HumanizeError};
use crate::services::lexicon::Lexicon;
use crate::services::randomness::{pick, RandomSource};
use crate::services::text_processor::{
    apply_phrase_rules, apply_phrase_rules_single_pass, capitalize_first, ensure_terminal_punctuation,
    is_sentence_start, join_paragraphs, lowercase_first, match_case, opens_with_marker, split_paragraph_sentences,
    split_terminator, word_count,
};

const STAGE: &str = "obfuscator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObfuscationPass {
    NormalizeDelimiters,
    WordFrequencyVariation,
    SyntacticJitter,
    DiscourseMarkers,
    NgramBreaking,
    SentenceSplitting,
    SentenceMerging,
    ParagraphRestructuring,
    HumanInconsistency,
    PersonalVoice,
    AdversarialAsides,
    FinalCleanup,
}

pub const PASS_ORDER: [ObfuscationPass; 12] = [
    ObfuscationPass::NormalizeDelimiters,
    ObfuscationPass::WordFrequencyVariation,
    ObfuscationPass::SyntacticJitter,
    ObfuscationPass::DiscourseMarkers,
    ObfuscationPass::NgramBreaking,
    ObfuscationPass::SentenceSplitting,
    ObfuscationPass::SentenceMerging,
    ObfuscationPass::ParagraphRestructuring,
    ObfuscationPass::HumanInconsistency,
    ObfuscationPass::PersonalVoice,
    ObfuscationPass::AdversarialAsides,
    ObfuscationPass::FinalCleanup,
];

impl ObfuscationPass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NormalizeDelimiters => "normalize_delimiters",
            Self::WordFrequencyVariation => "word_frequency_variation",
            Self::SyntacticJitter => "syntactic_jitter",
            Self::DiscourseMarkers => "discourse_markers",
            Self::NgramBreaking => "ngram_breaking",
            Self::SentenceSplitting => "sentence_splitting",
            Self::SentenceMerging => "sentence_merging",
            Self::ParagraphRestructuring => "paragraph_restructuring",
            Self::HumanInconsistency => "human_inconsistency",
            Self::PersonalVoice => "personal_voice",
            Self::AdversarialAsides => "adversarial_asides",
            Self::FinalCleanup => "final_cleanup",
        }
    }

    /// Probability that the pass runs at all
    pub fn gate(&self) -> f64 {
        match self {
            Self::NormalizeDelimiters => 1.0,
            Self::WordFrequencyVariation => 0.7,
            Self::SyntacticJitter => 0.9,
            Self::DiscourseMarkers => 0.9,
            Self::NgramBreaking => 0.6,
            Self::SentenceSplitting => 0.5,
            Self::SentenceMerging => 0.4,
            Self::ParagraphRestructuring => 0.5,
            Self::HumanInconsistency => 0.3,
            Self::PersonalVoice => 0.35,
            Self::AdversarialAsides => 0.3,
            Self::FinalCleanup => 1.0,
        }
    }
}

// Per-site rates inside a pass that has opened its gate
const JITTER_RATE: f64 = 0.85;
const DISCOURSE_RATE: f64 = 0.8;
const REPEAT_VARIATION_RATE: f64 = 0.6;
const NGRAM_BREAK_RATE: f64 = 0.5;
const SPLIT_RATE: f64 = 0.6;
const MERGE_RATE: f64 = 0.35;
const VARIANT_RATE: f64 = 0.3;
const VOICE_RATE: f64 = 0.15;
const ASIDE_RATE: f64 = 0.2;

const SPLIT_MIN_WORDS: usize = 16;
const MERGE_MAX_WORDS: usize = 8;
const PARAGRAPH_SPLIT_MIN: usize = 6;

fn regex(cell: &'static OnceLock<Regex>, src: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(src).expect("obfuscator regex"))
}

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"[ \t]+")
}

fn space_before_punct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"[ \t]+([,.;:!?)])")
}

fn repeated_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r",(?:[ \t]*,)+")
}

fn clause_before_terminal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"[,;:][ \t]*([.!?])")
}

fn comma_after_terminal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"([.!?])[ \t]*,")
}

fn doubled_period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(^|[^.])\.\.([^.]|$)")
}

fn long_ellipsis_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\.{4,}")
}

fn repeated_bang_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"([!?])[!?]{2,}")
}

fn comma_letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r",([A-Za-z])")
}

fn trailing_conjunction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i),?[ \t]+(?:and|but|or|because)[ \t]*([.!?])")
}

fn sentence_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(^|[.!?][ \t]+|\n[ \t]*)([a-z])")
}

fn paren_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\([ \t]+")
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\n[ \t]*\n(?:[ \t]*\n)+")
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\b[A-Za-z][a-z]+\b")
}

fn split_point_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r", (and|but) |; ")
}

pub struct Obfuscator {
    lexicon: Arc<Lexicon>,
}

impl Obfuscator {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    /// Run every pass in [`PASS_ORDER`], each behind its own gate draw
    pub fn obfuscate(&self, text: &str, rng: &mut dyn RandomSource) -> Result<String, HumanizeError> {
        let mut current = text.to_string();
        let mut applied = Vec::new();
        for pass in PASS_ORDER {
            if !rng.chance(pass.gate()) {
                continue;
            }
            let next = self.run_pass(pass, &current, rng);
            // a pass that empties the text is discarded; cleanup still runs
            if next.trim().is_empty() && !current.trim().is_empty() {
                continue;
            }
            current = next;
            applied.push(pass.name());
        }
        debug!(passes = ?applied, "[OBFUSCATOR] passes applied");
        ensure_non_empty(STAGE, text, current)
    }

    pub fn run_pass(&self, pass: ObfuscationPass, text: &str, rng: &mut dyn RandomSource) -> String {
        match pass {
            ObfuscationPass::NormalizeDelimiters => normalize_delimiters(text),
            ObfuscationPass::WordFrequencyVariation => self.vary_word_frequency(text, rng),
            ObfuscationPass::SyntacticJitter => {
                apply_phrase_rules(text, &self.lexicon.syntactic_jitter, JITTER_RATE, rng, true).0
            }
            ObfuscationPass::DiscourseMarkers => self.replace_discourse_markers(text, rng),
            ObfuscationPass::NgramBreaking => self.break_ngrams(text, rng),
            ObfuscationPass::SentenceSplitting => split_long_sentences(text, rng),
            ObfuscationPass::SentenceMerging => merge_short_sentences(text, rng),
            ObfuscationPass::ParagraphRestructuring => restructure_paragraphs(text, rng),
            ObfuscationPass::HumanInconsistency => {
                // variants map both ways; one scan keeps a swap from being undone
                apply_phrase_rules_single_pass(text, &self.lexicon.spelling_variants, VARIANT_RATE, rng, true).0
            }
            ObfuscationPass::PersonalVoice => self.add_personal_voice(text, rng),
            ObfuscationPass::AdversarialAsides => self.add_asides(text, rng),
            ObfuscationPass::FinalCleanup => final_cleanup(text),
        }
    }

    /// Rotate synonyms for words used more than once; the first use stays
    fn vary_word_frequency(&self, text: &str, rng: &mut dyn RandomSource) -> String {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for m in word_re().find_iter(text) {
            *counts.entry(m.as_str().to_lowercase()).or_insert(0) += 1;
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        word_re()
            .replace_all(text, |caps: &Captures| {
                let word = &caps[0];
                let key = word.to_lowercase();
                let total = counts.get(&key).copied().unwrap_or(0);
                let occurrence = {
                    let n = seen.entry(key.clone()).or_insert(0);
                    *n += 1;
                    *n
                };
                let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
                let capitalised = word.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
                if total < 2 || occurrence == 1 || (capitalised && !is_sentence_start(text, start)) {
                    return word.to_string();
                }
                match self.lexicon.synonym_rule(&key) {
                    Some(rule) if rng.chance(REPEAT_VARIATION_RATE) => pick(rng, &rule.alternatives)
                        .map(|alt| match_case(word, alt))
                        .unwrap_or_else(|| word.to_string()),
                    _ => word.to_string(),
                }
            })
            .into_owned()
    }

    fn replace_discourse_markers(&self, text: &str, rng: &mut dyn RandomSource) -> String {
        let paragraphs: Vec<Vec<String>> = split_paragraph_sentences(text)
            .into_iter()
            .map(|sentences| {
                sentences
                    .into_iter()
                    .map(|sentence| self.replace_opener(&sentence, rng))
                    .collect()
            })
            .collect();
        join_paragraphs(&paragraphs)
    }

    fn replace_opener(&self, sentence: &str, rng: &mut dyn RandomSource) -> String {
        for group in &self.lexicon.discourse_markers {
            let Some(m) = group.opener.find(sentence) else {
                continue;
            };
            if !rng.chance(DISCOURSE_RATE) {
                return sentence.to_string();
            }
            let Some(replacement) = pick(rng, &group.replacements) else {
                return sentence.to_string();
            };
            let rest = sentence[m.end()..].trim_start();
            if rest.is_empty() {
                return sentence.to_string();
            }
            return format!("{} {}", replacement, lowercase_first(rest));
        }
        sentence.to_string()
    }

    /// Second and later occurrences of a repeated word trigram get their
    /// middle word swapped for a synonym
    fn break_ngrams(&self, text: &str, rng: &mut dyn RandomSource) -> String {
        let paragraphs: Vec<String> = text
            .split("\n\n")
            .map(|paragraph| {
                let mut tokens: Vec<String> = paragraph.split_whitespace().map(|t| t.to_string()).collect();
                let keys: Vec<String> = tokens
                    .iter()
                    .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
                    .collect();
                let mut seen: HashMap<(String, String, String), usize> = HashMap::new();
                // windows overlapping a swapped word are left alone
                let mut next_allowed = 0usize;
                for i in 0..keys.len().saturating_sub(2) {
                    let key = (keys[i].clone(), keys[i + 1].clone(), keys[i + 2].clone());
                    let count = seen.entry(key).or_insert(0);
                    *count += 1;
                    if *count < 2 || i < next_allowed {
                        continue;
                    }
                    let middle = &tokens[i + 1];
                    let plain = middle.chars().all(|c| c.is_ascii_lowercase());
                    if !plain || !rng.chance(NGRAM_BREAK_RATE) {
                        continue;
                    }
                    if let Some(alt) = self
                        .lexicon
                        .synonym_rule(middle)
                        .and_then(|rule| pick(rng, &rule.alternatives))
                    {
                        tokens[i + 1] = alt.clone();
                        next_allowed = i + 3;
                    }
                }
                tokens.join(" ")
            })
            .collect();
        paragraphs.join("\n\n")
    }

    fn add_personal_voice(&self, text: &str, rng: &mut dyn RandomSource) -> String {
        let mut paragraphs = split_paragraph_sentences(text);
        let total: usize = paragraphs.iter().map(|p| p.len()).sum();
        let mut budget = total.div_ceil(5).max(1);
        for sentence in paragraphs.iter_mut().flatten() {
            if budget == 0 {
                break;
            }
            if word_count(sentence) < 4
                || sentence.ends_with('?')
                || !rng.chance(VOICE_RATE)
                || opens_with_marker(sentence)
            {
                continue;
            }
            if let Some(opener) = pick(rng, &self.lexicon.personal_voice) {
                *sentence = format!("{} {}", opener, lowercase_first(sentence));
                budget -= 1;
            }
        }
        join_paragraphs(&paragraphs)
    }

    /// Slip an aside in after the first comma of longer sentences
    fn add_asides(&self, text: &str, rng: &mut dyn RandomSource) -> String {
        let mut paragraphs = split_paragraph_sentences(text);
        for sentence in paragraphs.iter_mut().flatten() {
            if word_count(sentence) < 8 || !rng.chance(ASIDE_RATE) {
                continue;
            }
            let Some(idx) = sentence.find(", ") else {
                continue;
            };
            if let Some(aside) = pick(rng, &self.lexicon.adversarial_asides) {
                let (head, tail) = sentence.split_at(idx + 2);
                *sentence = format!("{}{} {}", head, aside, tail);
            }
        }
        join_paragraphs(&paragraphs)
    }
}

pub fn normalize_delimiters(text: &str) -> String {
    let s = text.replace('\u{2026}', "...").replace("\r\n", "\n");
    let s = horizontal_ws_re().replace_all(&s, " ");
    let s = space_before_punct_re().replace_all(&s, "$1");
    s.lines().map(|l| l.trim()).collect::<Vec<_>>().join("\n").trim().to_string()
}

/// Break long sentences at a conjunction comma or semicolon
fn split_long_sentences(text: &str, rng: &mut dyn RandomSource) -> String {
    let paragraphs: Vec<Vec<String>> = split_paragraph_sentences(text)
        .into_iter()
        .map(|sentences| {
            let mut out = Vec::with_capacity(sentences.len());
            for sentence in sentences {
                if word_count(&sentence) < SPLIT_MIN_WORDS {
                    out.push(sentence);
                    continue;
                }
                let point = split_point_re().find_iter(&sentence).find(|m| {
                    word_count(&sentence[..m.start()]) >= 4 && word_count(&sentence[m.end()..]) >= 4
                });
                match point {
                    Some(m) if rng.chance(SPLIT_RATE) => {
                        let head = ensure_terminal_punctuation(&sentence[..m.start()]);
                        let conjunction = m.as_str().trim_matches(|c: char| c == ',' || c == ';' || c == ' ');
                        let tail = if conjunction.is_empty() {
                            capitalize_first(&sentence[m.end()..])
                        } else {
                            format!("{} {}", capitalize_first(conjunction), &sentence[m.end()..])
                        };
                        out.push(head);
                        out.push(tail);
                    }
                    _ => out.push(sentence),
                }
            }
            out
        })
        .collect();
    join_paragraphs(&paragraphs)
}

/// Join adjacent short statements with a semicolon or dash
fn merge_short_sentences(text: &str, rng: &mut dyn RandomSource) -> String {
    const JOINERS: [&str; 2] = ["; ", " - "];
    let paragraphs: Vec<Vec<String>> = split_paragraph_sentences(text)
        .into_iter()
        .map(|sentences| {
            let mut out: Vec<String> = Vec::with_capacity(sentences.len());
            let mut iter = sentences.into_iter().peekable();
            while let Some(current) = iter.next() {
                let mergeable = iter.peek().map(|next| {
                    current.ends_with('.')
                        && !current.ends_with("..")
                        && word_count(&current) <= MERGE_MAX_WORDS
                        && word_count(next) <= MERGE_MAX_WORDS
                });
                if mergeable == Some(true) && rng.chance(MERGE_RATE) {
                    if let Some(next) = iter.next() {
                        let joiner = pick(rng, &JOINERS).copied().unwrap_or("; ");
                        let (body, _) = split_terminator(&current);
                        out.push(format!("{}{}{}", body, joiner, lowercase_first(&next)));
                        continue;
                    }
                }
                out.push(current);
            }
            out
        })
        .collect();
    join_paragraphs(&paragraphs)
}

/// Split overlong paragraphs and fold one-sentence paragraphs into their neighbour
fn restructure_paragraphs(text: &str, rng: &mut dyn RandomSource) -> String {
    let mut out: Vec<Vec<String>> = Vec::new();
    for sentences in split_paragraph_sentences(text) {
        if sentences.len() >= PARAGRAPH_SPLIT_MIN {
            let cut = 2 + rng.index(sentences.len() - 3);
            let (head, tail) = sentences.split_at(cut);
            out.push(head.to_vec());
            out.push(tail.to_vec());
            continue;
        }
        let short_single = sentences.len() == 1 && word_count(&sentences[0]) < 6;
        match out.last_mut() {
            Some(previous) if short_single && rng.chance(0.5) => previous.extend(sentences),
            _ => out.push(sentences),
        }
    }
    join_paragraphs(&out)
}

/// Repair punctuation and spacing artifacts left by earlier passes
pub fn final_cleanup(text: &str) -> String {
    let mut s = normalize_delimiters(text);
    s = long_ellipsis_re().replace_all(&s, "...").into_owned();
    s = repeated_bang_re().replace_all(&s, "$1").into_owned();
    s = repeated_comma_re().replace_all(&s, ",").into_owned();
    s = comma_after_terminal_re().replace_all(&s, "$1").into_owned();
    s = clause_before_terminal_re().replace_all(&s, "$1").into_owned();
    s = doubled_period_re().replace_all(&s, "$1.$2").into_owned();
    s = trailing_conjunction_re().replace_all(&s, "$1").into_owned();
    s = comma_letter_re().replace_all(&s, ", $1").into_owned();
    s = paren_space_re().replace_all(&s, "(").into_owned();
    s = horizontal_ws_re().replace_all(&s, " ").into_owned();
    s = blank_lines_re().replace_all(&s, "\n\n").into_owned();
    s = sentence_start_re()
        .replace_all(&s, |caps: &Captures| format!("{}{}", &caps[1], caps[2].to_uppercase()))
        .into_owned();

    let paragraphs: Vec<String> = s
        .split("\n\n")
        .map(|p| ensure_terminal_punctuation(p.trim()))
        .filter(|p| !p.is_empty())
        .collect();
    paragraphs.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::randomness::{SeededRandom, SequenceRandom};

    fn obfuscator() -> Obfuscator {
        Obfuscator::new(Lexicon::builtin())
    }

    #[test]
    fn test_pass_order_is_fixed_and_cleanup_last() {
        assert_eq!(PASS_ORDER.len(), 12);
        assert_eq!(PASS_ORDER[0], ObfuscationPass::NormalizeDelimiters);
        assert_eq!(PASS_ORDER[11], ObfuscationPass::FinalCleanup);
        assert_eq!(PASS_ORDER.iter().filter(|p| **p == ObfuscationPass::FinalCleanup).count(), 1);
        assert_eq!(ObfuscationPass::FinalCleanup.gate(), 1.0);
    }

    #[test]
    fn test_final_cleanup_repairs_artifacts() {
        assert_eq!(final_cleanup("hello ,, world and."), "Hello, world.");
        assert_eq!(final_cleanup("it works,so well ;."), "It works, so well.");
        assert_eq!(final_cleanup("wait.. what!!!  ok"), "Wait. What! Ok.");
        assert_eq!(final_cleanup("one.\n\n\n\ntwo"), "One.\n\nTwo.");
    }

    #[test]
    fn test_final_cleanup_keeps_numbers() {
        let text = "The meeting is on 5/3/2024 with 1,200 attendees and 3.5% growth.";
        assert_eq!(final_cleanup(text), text);
        assert_eq!(final_cleanup("Wait... really?"), "Wait... Really?");
    }

    #[test]
    fn test_jitter_rewrites_canonical_phrases() {
        let mut rng = SequenceRandom::always();
        let out = obfuscator().run_pass(
            ObfuscationPass::SyntacticJitter,
            "In conclusion, the implementation of advanced methodologies demonstrates significant improvements.",
            &mut rng,
        );
        assert_eq!(out, "So yeah, putting in newer methods works a lot better.");
    }

    #[test]
    fn test_discourse_marker_replacement() {
        let mut rng = SequenceRandom::always();
        let out = obfuscator().run_pass(
            ObfuscationPass::DiscourseMarkers,
            "Furthermore, the team grew. However, budgets shrank.",
            &mut rng,
        );
        assert_eq!(out, "Plus, the team grew. But honestly, budgets shrank.");
    }

    #[test]
    fn test_sentence_splitting_at_conjunction() {
        let mut rng = SequenceRandom::always();
        let text = "The committee reviewed every single proposal last spring, but nobody could agree on the final budget numbers.";
        let out = split_long_sentences(text, &mut rng);
        assert_eq!(
            out,
            "The committee reviewed every single proposal last spring. But nobody could agree on the final budget numbers."
        );
    }

    #[test]
    fn test_sentence_splitting_ignores_number_commas() {
        let mut rng = SequenceRandom::always();
        let text = "We counted 1,200 attendees on 5/3/2024 and everyone stayed until the very end of the evening session.";
        assert_eq!(split_long_sentences(text, &mut rng), text);
    }

    #[test]
    fn test_word_frequency_variation_keeps_first_use() {
        let mut rng = SequenceRandom::always();
        let out = obfuscator().run_pass(
            ObfuscationPass::WordFrequencyVariation,
            "The problem is old. The problem is new.",
            &mut rng,
        );
        assert_eq!(out, "The problem is old. The issue is new.");
    }

    #[test]
    fn test_ngram_breaking() {
        let mut rng = SequenceRandom::always();
        let out = obfuscator().run_pass(
            ObfuscationPass::NgramBreaking,
            "we use many tools. we use many tools.",
            &mut rng,
        );
        assert_eq!(out, "we use many tools. we try many tools.");
    }

    #[test]
    fn test_paragraph_restructuring_splits_long_paragraphs() {
        let mut rng = SequenceRandom::always();
        let text = "One a. Two b. Three c. Four d. Five e. Six f.";
        let out = restructure_paragraphs(text, &mut rng);
        assert_eq!(out, "One a. Two b.\n\nThree c. Four d. Five e. Six f.");
    }

    #[test]
    fn test_asides_after_first_comma() {
        let mut rng = SequenceRandom::always();
        let out = obfuscator().run_pass(
            ObfuscationPass::AdversarialAsides,
            "After the storm, we rebuilt the fence and the shed.",
            &mut rng,
        );
        assert_eq!(out, "After the storm, you know, we rebuilt the fence and the shed.");
    }

    #[test]
    fn test_personal_voice_budget() {
        let mut rng = SequenceRandom::always();
        let out = obfuscator().run_pass(
            ObfuscationPass::PersonalVoice,
            "The plan worked well. The rollout went fine.",
            &mut rng,
        );
        assert_eq!(out, "I think the plan worked well. The rollout went fine.");
    }

    #[test]
    fn test_spelling_variants_swap_once() {
        let mut rng = SequenceRandom::always();
        let out = obfuscator().run_pass(
            ObfuscationPass::HumanInconsistency,
            "We walked toward the park while it rained.",
            &mut rng,
        );
        assert_eq!(out, "We walked towards the park whilst it rained.");
    }

    #[test]
    fn test_personal_voice_does_not_stack_on_markers() {
        let mut rng = SequenceRandom::always();
        let text = "Also, Sarah Jones said the plan worked. Plus, the rollout went fine.";
        let out = obfuscator().run_pass(ObfuscationPass::PersonalVoice, text, &mut rng);
        assert_eq!(out, text);
    }

    #[test]
    fn test_never_gate_only_mandatory_passes() {
        let text = "In conclusion,  the results  are good .";
        let out = obfuscator().obfuscate(text, &mut SequenceRandom::never()).unwrap();
        assert_eq!(out, "In conclusion, the results are good.");
    }

    #[test]
    fn test_obfuscate_keeps_facts_and_stays_non_empty() {
        let text = "The meeting is on 5/3/2024 with 1,200 attendees. Furthermore, it is important to note that the venue, which was booked early, holds 1,500 people and the catering is included.";
        for seed in 0..30 {
            let out = obfuscator().obfuscate(text, &mut SeededRandom::new(seed)).unwrap();
            assert!(!out.trim().is_empty());
            assert!(out.contains("5/3/2024"), "seed {}: {}", seed, out);
            assert!(out.contains("1,200"), "seed {}: {}", seed, out);
            assert!(out.contains("1,500"), "seed {}: {}", seed, out);
        }
    }
}
