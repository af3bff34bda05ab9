// Style Synthesizer
// Rewrites each sentence toward a target voice with probability-gated substitutions.
// Output is random by contract; pass a seeded RandomSource for repeatable runs.

use regex::{Captures, Regex};
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::models::{
    Complexity, Configuration, Emotion, Formality, ScanResult, SemanticRole, SemanticUnit, SignalFamily, Style,
    Tense, Voice,
};
use crate::services::error::{ensure_non_empty, HumanizeError};
use crate::services::lexicon::Lexicon;
use crate::services::randomness::{pick, RandomSource};
use crate::services::text_processor::{
    apply_phrase_rules, capitalize_first, ensure_terminal_punctuation, lowercase_first, split_terminator,
};

const STAGE: &str = "style_synthesizer";

/// Added to every active gate of a sentence the scan flagged
const FLAGGED_BOOST: f64 = 0.3;

/// Families whose per-sentence matches mark a sentence for stronger rewriting
const TARGETED_FAMILIES: [SignalFamily; 3] =
    [SignalFamily::FormulaicTransitions, SignalFamily::Hedging, SignalFamily::AiVocabulary];

const DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "our", "their", "its", "his", "her", "my", "your",
];
const SUBJECT_PRONOUNS: &[&str] = &["i", "we", "you", "they", "he", "she", "it"];

/// Per-sentence substitution probabilities for one voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleProfile {
    pub contraction: f64,
    pub expansion: f64,
    pub filler: f64,
    pub informal: f64,
    pub formal: f64,
    pub voice_toggle: f64,
    /// Gate for the reverse toggle, active to passive
    pub passive_voice: f64,
    pub emotion: f64,
}

impl StyleProfile {
    /// Every non-zero gate lifted by [`FLAGGED_BOOST`], capped at 1
    pub fn intensified(&self) -> Self {
        let lift = |gate: f64| if gate > 0.0 { (gate + FLAGGED_BOOST).min(1.0) } else { 0.0 };
        Self {
            contraction: lift(self.contraction),
            expansion: lift(self.expansion),
            filler: lift(self.filler),
            informal: lift(self.informal),
            formal: lift(self.formal),
            voice_toggle: lift(self.voice_toggle),
            passive_voice: self.passive_voice,
            emotion: lift(self.emotion),
        }
    }
}

/// Concrete profile for every non-adaptive style. `Adaptive` must be
/// resolved with [`resolve_style`] first; it maps to the casual profile.
pub fn style_profile(style: Style) -> StyleProfile {
    match style {
        Style::Casual | Style::Adaptive => StyleProfile {
            contraction: 0.7,
            expansion: 0.0,
            filler: 0.1,
            informal: 0.6,
            formal: 0.0,
            voice_toggle: 0.5,
            passive_voice: 0.0,
            emotion: 0.15,
        },
        Style::Academic => StyleProfile {
            contraction: 0.0,
            expansion: 0.8,
            filler: 0.08,
            informal: 0.0,
            formal: 0.4,
            voice_toggle: 0.1,
            passive_voice: 0.2,
            emotion: 0.05,
        },
        Style::Creative => StyleProfile {
            contraction: 0.5,
            expansion: 0.0,
            filler: 0.12,
            informal: 0.4,
            formal: 0.0,
            voice_toggle: 0.4,
            passive_voice: 0.05,
            emotion: 0.2,
        },
        Style::Professional => StyleProfile {
            contraction: 0.3,
            expansion: 0.0,
            filler: 0.06,
            informal: 0.2,
            formal: 0.15,
            voice_toggle: 0.4,
            passive_voice: 0.05,
            emotion: 0.08,
        },
    }
}

/// Resolve `Style::Adaptive` against the configured formality.
///
/// high formality -> professional, low -> casual, medium -> professional for
/// high complexity else casual, adaptive formality -> casual. Explicit
/// styles pass through unchanged.
pub fn resolve_style(config: &Configuration) -> Style {
    match (config.style, config.formality) {
        (Style::Adaptive, Formality::High) => Style::Professional,
        (Style::Adaptive, Formality::Low) => Style::Casual,
        (Style::Adaptive, Formality::Medium) => {
            if config.complexity == Complexity::High {
                Style::Professional
            } else {
                Style::Casual
            }
        }
        (Style::Adaptive, Formality::Adaptive) => Style::Casual,
        (style, _) => style,
    }
}

/// True when the cultural context names British English
pub fn wants_uk_spelling(cultural_context: &str) -> bool {
    matches!(
        cultural_context.trim().to_lowercase().replace('_', "-").as_str(),
        "uk" | "gb" | "british" | "en-gb"
    )
}

fn passive_by_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?P<object>\b(?i:the|a|an|this|that|these|those|our|their|its)\s+[a-z][a-z\-]*)\s+(?i:was|were)\s+(?P<verb>[a-z]+ed)\s+by\s+(?P<agent>(?i:the|a|an|our|their|his|her|its)\s+[a-z][a-z\-]*|[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
        )
        .expect("passive-by regex")
    })
}

/// Best-effort `X was Yed by Z` -> `Z Yed x`. Returns None when nothing matched.
pub fn passive_to_active(sentence: &str) -> Option<String> {
    let re = passive_by_re();
    let m = re.find(sentence)?;
    let at_start = sentence[..m.start()].trim().is_empty();
    let rewritten = re.replace(sentence, |caps: &Captures| {
        let agent = if at_start {
            capitalize_first(&caps["agent"])
        } else {
            caps["agent"].to_string()
        };
        format!("{} {} {}", agent, &caps["verb"], lowercase_first(&caps["object"]))
    });
    Some(rewritten.into_owned())
}

fn active_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<verb>[a-z]+ed)\s+(?P<object>(?i:the|a|an|this|that|these|those|our|their|its)\s+[a-z][a-z\-]*)$",
        )
        .expect("active-object regex")
    })
}

/// Best-effort `Z Yed the x` -> `The x was Yed by z`, driven by the scanned
/// subject and predicate spans. Only simple past sentences with a
/// determiner-led object are rewritten; anything else yields None.
pub fn active_to_passive(unit: &SemanticUnit) -> Option<String> {
    if unit.voice != Voice::Active || unit.tense != Tense::Past || unit.subject.start >= unit.subject.end {
        return None;
    }
    let sentence = unit.text.as_str();
    if !sentence.get(..unit.subject.start)?.trim().is_empty() {
        return None;
    }
    let subject = sentence.get(unit.subject.start..unit.subject.end)?;
    let predicate = sentence.get(unit.predicate.start..unit.predicate.end)?;
    let tail = sentence.get(unit.predicate.end..)?;

    let subject_words: Vec<&str> = subject.split_whitespace().collect();
    if subject_words.is_empty() || subject_words.len() > 3 || subject.contains(',') {
        return None;
    }
    let head = subject_words[0].to_lowercase();
    let agent = if DETERMINERS.contains(&head.as_str()) {
        lowercase_first(subject)
    } else if !SUBJECT_PRONOUNS.contains(&head.as_str())
        && subject_words.iter().all(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false))
    {
        subject.to_string()
    } else {
        return None;
    };

    let caps = active_object_re().captures(predicate)?;
    let object = &caps["object"];
    let noun = object.split_whitespace().last().unwrap_or("");
    let aux = if noun.ends_with('s') && !noun.ends_with("ss") { "were" } else { "was" };
    Some(format!("{} {} {} by {}{}", capitalize_first(object), aux, &caps["verb"], agent, tail))
}

pub struct StyleSynthesizer {
    lexicon: Arc<Lexicon>,
}

impl StyleSynthesizer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    /// Rewrite every scanned sentence. The result has one entry per input
    /// sentence; a rewrite that comes out empty falls back to the original.
    pub fn synthesize(
        &self,
        scan: &ScanResult,
        config: &Configuration,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<String>, HumanizeError> {
        let style = resolve_style(config);
        let profile = style_profile(style);
        let uk = wants_uk_spelling(&config.cultural_context);

        let boosted = profile.intensified();
        let mut flagged = 0usize;
        let mut out = Vec::with_capacity(scan.sentences.len());
        for (i, sentence) in scan.sentences.iter().enumerate() {
            let unit = scan.units.get(i);
            let sentence_profile = if self.is_flagged(scan, unit, sentence) {
                flagged += 1;
                &boosted
            } else {
                &profile
            };
            let rewritten = self.rewrite_sentence(sentence, unit, style, sentence_profile, config.emotion, uk, rng);
            let rewritten = ensure_non_empty(STAGE, sentence, rewritten).unwrap_or_else(|_| sentence.clone());
            out.push(rewritten);
        }

        if !scan.sentences.is_empty() && out.iter().all(|s| s.trim().is_empty()) {
            return Err(HumanizeError::stage(STAGE, "all sentences rewritten to nothing"));
        }

        debug!(style = %style, sentences = out.len(), flagged, "[STYLE] sentences synthesized");
        Ok(out)
    }

    /// A transition opener, or a match for a family the scan counted
    fn is_flagged(&self, scan: &ScanResult, unit: Option<&SemanticUnit>, sentence: &str) -> bool {
        if unit.map(|u| u.role == SemanticRole::Transition).unwrap_or(false) {
            return true;
        }
        TARGETED_FAMILIES.iter().any(|&family| {
            scan.signal_count(family) > 0
                && self
                    .lexicon
                    .family_patterns(family)
                    .iter()
                    .any(|re| re.is_match(sentence))
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn rewrite_sentence(
        &self,
        sentence: &str,
        unit: Option<&SemanticUnit>,
        style: Style,
        profile: &StyleProfile,
        emotion: Emotion,
        uk: bool,
        rng: &mut dyn RandomSource,
    ) -> String {
        let lex = &self.lexicon;
        let mut s = sentence.to_string();

        match unit {
            Some(u) if u.voice == Voice::Passive => {
                if rng.chance(profile.voice_toggle) {
                    if let Some(active) = passive_to_active(&s) {
                        s = active;
                    }
                }
            }
            Some(u) if u.text == sentence => {
                if let Some(passive) = active_to_passive(u) {
                    if rng.chance(profile.passive_voice) {
                        s = passive;
                    }
                }
            }
            _ => {}
        }

        if profile.informal > 0.0 {
            s = apply_phrase_rules(&s, &lex.formal_to_informal, profile.informal, rng, true).0;
        }
        if profile.formal > 0.0 {
            s = apply_phrase_rules(&s, &lex.informal_to_formal, profile.formal, rng, true).0;
        }
        if profile.contraction > 0.0 {
            s = apply_phrase_rules(&s, &lex.contractions, profile.contraction, rng, true).0;
        }
        if profile.expansion > 0.0 {
            s = apply_phrase_rules(&s, &lex.expansions, profile.expansion, rng, true).0;
        }

        if s.split_whitespace().count() > 5 && rng.chance(profile.filler) {
            if let Some(filler) = pick(rng, lex.fillers(style)) {
                s = insert_filler(&s, filler, rng);
            }
        }

        if rng.chance(profile.emotion) {
            if let Some(marker) = pick(rng, lex.emotion_markers(emotion)) {
                let (body, terminator) = split_terminator(&s);
                let terminator = if terminator.is_empty() { "." } else { terminator };
                s = format!("{}, {}{}", body.trim_end_matches(','), marker, terminator);
            }
        }

        if uk {
            s = apply_phrase_rules(&s, &lex.uk_spellings, 1.0, rng, true).0;
        }

        ensure_terminal_punctuation(&capitalize_first(s.trim()))
    }
}

/// Insert `filler` between two interior words. Slots touching a name or a
/// number are skipped so dates like "March 3, 2025" stay whole.
fn insert_filler(sentence: &str, filler: &str, rng: &mut dyn RandomSource) -> String {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    let upper = |w: &str| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
    let numeric = |w: &str| w.chars().any(|c| c.is_ascii_digit());
    let slots: Vec<usize> = (1..words.len())
        .filter(|&i| {
            let (prev, next) = (words[i - 1], words[i]);
            !upper(next)
                && !(i > 1 && upper(prev))
                && !numeric(prev)
                && !numeric(next)
                && !prev.ends_with(|c: char| matches!(c, '.' | '!' | '?'))
        })
        .collect();
    let Some(&slot) = pick(rng, &slots) else {
        return sentence.to_string();
    };
    let mut out: Vec<&str> = Vec::with_capacity(words.len() + 1);
    out.extend_from_slice(&words[..slot]);
    out.push(filler);
    out.extend_from_slice(&words[slot..]);
    out.join(" ")
}
