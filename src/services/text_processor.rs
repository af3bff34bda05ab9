// Text Processing Service
// Sentence segmentation, tokenisation, stylometry and phrase-rule application

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::services::lexicon::PhraseRule;
use crate::services::randomness::{pick, RandomSource};

fn space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{3000}\u{00A0}]").expect("space regex"))
}

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\x0C\x0B]+").expect("whitespace regex"))
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph regex"))
}

fn marker_opener_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^["'(]*[A-Za-z][A-Za-z']*,\s"#).expect("marker opener regex"))
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9][A-Za-z0-9'\-]*").expect("word regex"))
}

/// Normalize punctuation and whitespace while keeping paragraph breaks
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut s = text.to_string();

    // Replace smart quotes
    s = s.replace('\u{201c}', "\"")
         .replace('\u{201d}', "\"")
         .replace('\u{2018}', "'")
         .replace('\u{2019}', "'");

    // Replace em/en dash
    s = s.replace('\u{2014}', " - ").replace('\u{2013}', "-");

    s = space_re().replace_all(&s, " ").to_string();

    // Normalize line endings
    s = s.replace("\r\n", "\n").replace('\r', "\n");

    s = horizontal_ws_re().replace_all(&s, " ").to_string();

    // Strip each line
    s = s.lines()
         .map(|ln| ln.trim())
         .collect::<Vec<_>>()
         .join("\n");

    s.trim().to_string()
}

/// Split text into paragraphs on blank lines
pub fn split_paragraphs(text: &str) -> Vec<String> {
    paragraph_re()
        .split(text)
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Split a paragraph into sentences.
///
/// A run of `.`, `!` or `?` ends a sentence and stays attached to it. A `.`
/// sitting between two digits is a decimal point, not a boundary. Text
/// without terminal punctuation comes back as a single sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return vec![];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut buffer = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        buffer.push(ch);

        if is_terminal(ch) {
            if ch == '.'
                && i > 0
                && i + 1 < chars.len()
                && chars[i - 1].is_ascii_digit()
                && chars[i + 1].is_ascii_digit()
            {
                i += 1;
                continue;
            }

            // Absorb the rest of the punctuation run and any closing quotes/brackets
            while i + 1 < chars.len() && (is_terminal(chars[i + 1]) || matches!(chars[i + 1], '"' | '\'' | ')')) {
                i += 1;
                buffer.push(chars[i]);
            }

            let sentence = buffer.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            buffer.clear();
        }

        i += 1;
    }

    let remaining = buffer.trim().to_string();
    if !remaining.is_empty() {
        sentences.push(remaining);
    }

    sentences
}

/// Sentences grouped by paragraph, in order
pub fn split_paragraph_sentences(text: &str) -> Vec<Vec<String>> {
    split_paragraphs(text)
        .iter()
        .map(|p| split_sentences(p))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Join sentences back into paragraphs separated by blank lines
pub fn join_paragraphs(paragraphs: &[Vec<String>]) -> String {
    paragraphs
        .iter()
        .map(|sentences| sentences.join(" "))
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercase word tokens (letters, digits, inner apostrophes and hyphens)
pub fn words(text: &str) -> Vec<String> {
    word_re()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Lowercase whitespace tokens with surrounding punctuation stripped
pub fn token_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn sentence_lengths(text: &str) -> Vec<usize> {
    split_paragraphs(text)
        .iter()
        .flat_map(|p| split_sentences(p))
        .map(|s| word_count(&s))
        .filter(|&n| n > 0)
        .collect()
}

/// Population variance of sentence lengths in words
pub fn burstiness(text: &str) -> f64 {
    let lengths = sentence_lengths(text);
    if lengths.is_empty() {
        return 0.0;
    }
    let values: Vec<f64> = lengths.iter().map(|&l| l as f64).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn ends_with_terminal(text: &str) -> bool {
    text.trim_end()
        .trim_end_matches(|c| matches!(c, '"' | '\'' | ')'))
        .chars()
        .last()
        .map(is_terminal)
        .unwrap_or(false)
}

/// Re-add a trailing period when rewriting stripped the sentence terminator.
/// A sentence made only of clause punctuation is returned trimmed, as is.
pub fn ensure_terminal_punctuation(sentence: &str) -> String {
    let trimmed = sentence.trim().trim_end_matches(|c| matches!(c, ',' | ';' | ':' | '-')).trim_end();
    if trimmed.is_empty() {
        return sentence.trim().to_string();
    }
    if ends_with_terminal(trimmed) {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}

/// Strip the terminal punctuation run, returning (body, terminator)
pub fn split_terminator(sentence: &str) -> (&str, &str) {
    let trimmed = sentence.trim_end();
    let body = trimmed.trim_end_matches(is_terminal);
    (body, &trimmed[body.len()..])
}

pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => {
            // Keep acronyms, the pronoun "I" and multi-word names as written.
            // A first word closed by punctuation ("Plus,") is a marker, not a name.
            let second_upper = chars.clone().next().map(|c| c.is_uppercase()).unwrap_or(false);
            let first_word_open = text
                .split_whitespace()
                .next()
                .map(|w| w.ends_with(|c: char| c.is_alphanumeric()))
                .unwrap_or(false);
            let next_word_upper = first_word_open
                && text
                    .split_whitespace()
                    .nth(1)
                    .and_then(|w| w.chars().next())
                    .map(|c| c.is_uppercase())
                    .unwrap_or(false);
            if second_upper || is_pronoun_i(text) || next_word_upper {
                text.to_string()
            } else {
                first.to_lowercase().chain(chars).collect()
            }
        }
        None => String::new(),
    }
}

fn is_pronoun_i(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next() == Some('I') && chars.next().map(|c| !c.is_alphanumeric()).unwrap_or(true)
}

/// Carry the capitalisation of `original` over to `replacement`
pub fn match_case(original: &str, replacement: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return replacement.to_uppercase();
    }
    if original.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
        return capitalize_first(replacement);
    }
    replacement.to_string()
}

/// True when the sentence already opens with a one-word marker such as "Plus, "
pub fn opens_with_marker(sentence: &str) -> bool {
    marker_opener_re().is_match(sentence.trim_start())
}

/// True when `byte_idx` begins a sentence (only whitespace, quotes or a
/// terminator run precede it)
pub fn is_sentence_start(text: &str, byte_idx: usize) -> bool {
    let before = text.get(..byte_idx).unwrap_or("");
    match before.trim_end().trim_end_matches(|c| matches!(c, '"' | '\'' | '(')).chars().last() {
        None => true,
        Some(c) => is_terminal(c) || c == '\n',
    }
}

/// Apply phrase rules, each match replaced with probability `probability`.
///
/// When `protect_entities` is set, a capitalised match that does not open a
/// sentence is left alone (it is most likely part of a proper noun).
/// Returns the rewritten text and the number of replacements made.
pub fn apply_phrase_rules(
    text: &str,
    rules: &[PhraseRule],
    probability: f64,
    rng: &mut dyn RandomSource,
    protect_entities: bool,
) -> (String, usize) {
    let mut out = text.to_string();
    let mut total = 0usize;

    for rule in rules {
        if rule.alternatives.is_empty() || !rule.pattern.is_match(&out) {
            continue;
        }
        let mut count = 0usize;
        let next = rule
            .pattern
            .replace_all(&out, |caps: &Captures| {
                let m = caps.get(0).map(|m| (m.start(), m.as_str())).unwrap_or((0, ""));
                let (start, original) = m;
                let capitalised = original.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
                    && !is_pronoun_i(original);
                if protect_entities && capitalised && !is_sentence_start(&out, start) {
                    return original.to_string();
                }
                if !rng.chance(probability) {
                    return original.to_string();
                }
                match pick(rng, &rule.alternatives) {
                    Some(alt) => {
                        count += 1;
                        match_case(original, alt)
                    }
                    None => original.to_string(),
                }
            })
            .into_owned();
        out = next;
        total += count;
    }

    (out, total)
}

/// Like [`apply_phrase_rules`], but every rule matches against the input text
/// only, so one rule can never rewrite the output of another. Overlapping
/// matches keep the earliest, then the longest.
pub fn apply_phrase_rules_single_pass(
    text: &str,
    rules: &[PhraseRule],
    probability: f64,
    rng: &mut dyn RandomSource,
    protect_entities: bool,
) -> (String, usize) {
    let mut matches: Vec<(usize, usize, &PhraseRule)> = rules
        .iter()
        .filter(|rule| !rule.alternatives.is_empty())
        .flat_map(|rule| rule.pattern.find_iter(text).map(move |m| (m.start(), m.end(), rule)))
        .collect();
    matches.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    let mut total = 0usize;
    for (start, end, rule) in matches {
        if start < cursor {
            continue;
        }
        let original = &text[start..end];
        out.push_str(&text[cursor..start]);
        cursor = end;

        let capitalised = original.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
            && !is_pronoun_i(original);
        if (protect_entities && capitalised && !is_sentence_start(text, start)) || !rng.chance(probability) {
            out.push_str(original);
            continue;
        }
        match pick(rng, &rule.alternatives) {
            Some(alt) => {
                total += 1;
                out.push_str(&match_case(original, alt));
            }
            None => out.push_str(original),
        }
    }
    out.push_str(&text[cursor..]);
    (out, total)
}

/// Stylometry metrics over English word tokens
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StylometryMetrics {
    pub ttr: f64,              // Type-Token Ratio
    pub avg_sentence_len: f64, // in words
    pub sentence_len_cv: f64,  // coefficient of variation of sentence lengths
    pub sentence_count: usize,
    pub repeat_ratio: f64,
    pub ngram_repeat_rate: f64,
}

pub fn compute_stylometry(text: &str) -> StylometryMetrics {
    let tokens = words(text);
    if tokens.is_empty() {
        return StylometryMetrics::default();
    }
    let total_words = tokens.len();

    let unique_words: HashSet<&str> = tokens.iter().map(|t| t.as_str()).collect();
    let ttr = unique_words.len() as f64 / total_words as f64;

    let lengths = sentence_lengths(text);
    let sentence_count = lengths.len().max(1);
    let avg_sentence_len = if lengths.is_empty() {
        total_words as f64
    } else {
        lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
    };
    let sentence_len_cv = if lengths.len() < 2 || avg_sentence_len <= 0.0 {
        0.0
    } else {
        let variance = lengths
            .iter()
            .map(|&l| (l as f64 - avg_sentence_len).powi(2))
            .sum::<f64>()
            / lengths.len() as f64;
        variance.sqrt() / avg_sentence_len
    };

    // Repeat ratio: fraction of vocab items that occur >= 3 times
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for t in &tokens {
        *freq.entry(t.as_str()).or_insert(0) += 1;
    }
    let repeat_ratio = freq.values().filter(|&&v| v >= 3).count() as f64 / freq.len().max(1) as f64;

    let refs: Vec<&str> = tokens.iter().map(|t| t.as_str()).collect();

    StylometryMetrics {
        ttr,
        avg_sentence_len,
        sentence_len_cv,
        sentence_count,
        repeat_ratio,
        ngram_repeat_rate: ngram_repeat_rate(&refs, 3),
    }
}

pub fn ngram_repeat_rate(tokens: &[&str], n: usize) -> f64 {
    if n == 0 || tokens.len() < n + 1 {
        return 0.0;
    }
    let mut counts: HashMap<Vec<&str>, usize> = HashMap::new();
    let mut total = 0usize;
    for i in 0..=tokens.len().saturating_sub(n) {
        let key: Vec<&str> = tokens[i..i + n].to_vec();
        *counts.entry(key).or_insert(0) += 1;
        total += 1;
    }
    let repeats = counts.values().filter(|&&c| c >= 2).map(|&c| c - 1).sum::<usize>();
    repeats as f64 / total.max(1) as f64
}
