// Reengineer
// Sentence rhythm model, register mixing and stylistic noise.

use std::sync::Arc;
use tracing::debug;

use crate::models::{Complexity, Configuration};
use crate::services::error::{ensure_non_empty, HumanizeError};
use crate::services::lexicon::Lexicon;
use crate::services::randomness::{pick, RandomSource};
use crate::services::text_processor::{
    apply_phrase_rules, capitalize_first, ensure_terminal_punctuation, join_paragraphs, lowercase_first,
    opens_with_marker, split_paragraph_sentences, split_terminator, word_count,
};

const STAGE: &str = "reengineer";

const DEFAULT_RHYTHM: [f64; 5] = [0.2, 0.5, 0.8, 0.6, 0.3];
const RHYTHM_NOISE: f64 = 0.1;

/// Sentence treatment chosen from the rhythm value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Treatment {
    Shorten,
    MinorVary,
    AddSubordinate,
    Elaborate,
}

/// Bands `[0, .25)`, `[.25, .5)`, `[.5, .75)`, `[.75, 1]`
pub fn treatment_for(value: f64) -> Treatment {
    if value < 0.25 {
        Treatment::Shorten
    } else if value < 0.5 {
        Treatment::MinorVary
    } else if value < 0.75 {
        Treatment::AddSubordinate
    } else {
        Treatment::Elaborate
    }
}

pub fn complexity_bias(complexity: Complexity) -> f64 {
    match complexity {
        Complexity::Low => -0.2,
        Complexity::Medium => 0.0,
        Complexity::High => 0.2,
    }
}

fn level(complexity: Complexity) -> i32 {
    match complexity {
        Complexity::Low => 0,
        Complexity::Medium => 1,
        Complexity::High => 2,
    }
}

/// Configured bias plus a 0.1-per-level pull from the scanned complexity
/// of the source toward the configured one
pub fn rhythm_bias(target: Complexity, observed: Complexity) -> f64 {
    complexity_bias(target) + 0.1 * f64::from(level(target) - level(observed))
}

#[derive(Debug, Clone, Copy)]
struct NoiseRates {
    register: f64,
    adverb: f64,
    rhetorical: f64,
    parenthetical: f64,
    merge_short: f64,
}

const NOISE: NoiseRates = NoiseRates {
    register: 0.3,
    adverb: 0.08,
    rhetorical: 0.05,
    parenthetical: 0.05,
    merge_short: 0.3,
};

pub struct Reengineer {
    lexicon: Arc<Lexicon>,
}

impl Reengineer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    fn rhythm(&self) -> &[f64] {
        if self.lexicon.rhythm_pattern.is_empty() {
            &DEFAULT_RHYTHM
        } else {
            &self.lexicon.rhythm_pattern
        }
    }

    /// Walk the rhythm pattern once per sentence and apply the chosen
    /// treatment, then mix registers and add stylistic noise. Every sentence
    /// leaves with terminal punctuation.
    pub fn reengineer(
        &self,
        text: &str,
        config: &Configuration,
        rng: &mut dyn RandomSource,
    ) -> Result<String, HumanizeError> {
        self.reengineer_from(text, config.complexity, config, rng)
    }

    /// [`Reengineer::reengineer`] for a source whose scanned complexity is
    /// `observed`: a source denser than the configured complexity is pushed
    /// toward shorter treatments, a sparser one toward longer.
    pub fn reengineer_from(
        &self,
        text: &str,
        observed: Complexity,
        config: &Configuration,
        rng: &mut dyn RandomSource,
    ) -> Result<String, HumanizeError> {
        let rhythm = self.rhythm();
        let bias = rhythm_bias(config.complexity, observed);
        let mut position = 0usize;
        let mut paragraphs = Vec::new();

        for paragraph in split_paragraph_sentences(text) {
            let mut rebuilt: Vec<String> = Vec::with_capacity(paragraph.len());
            for sentence in paragraph {
                let target = rhythm[position % rhythm.len()] + rng.range(-RHYTHM_NOISE, RHYTHM_NOISE) + bias;
                position += 1;
                let treatment = treatment_for(target.clamp(0.0, 1.0));

                let mut s = self.apply_treatment(&sentence, treatment, rng);
                s = self.mix_register(&s, config.complexity, rng);
                s = self.add_noise(&s, rng);
                let s = ensure_terminal_punctuation(&s);
                if s.is_empty() {
                    rebuilt.push(ensure_terminal_punctuation(&sentence));
                } else {
                    rebuilt.push(s);
                }

                if rng.chance(NOISE.rhetorical) {
                    if let Some(q) = pick(rng, &self.lexicon.rhetorical_questions) {
                        rebuilt.push(q.clone());
                    }
                }
            }
            paragraphs.push(self.merge_short_sentences(rebuilt, rng));
        }

        let output = join_paragraphs(&paragraphs);
        debug!(sentences = position, bias, "[REENGINEER] rhythm applied");
        ensure_non_empty(STAGE, text, output)
    }

    fn apply_treatment(&self, sentence: &str, treatment: Treatment, rng: &mut dyn RandomSource) -> String {
        let lex = &self.lexicon;
        let words = word_count(sentence);
        match treatment {
            Treatment::Shorten => {
                let (shorter, _) = apply_phrase_rules(sentence, &lex.concise_phrases, 1.0, rng, true);
                let shorter = shorter.split_whitespace().collect::<Vec<_>>().join(" ");
                if word_count(&shorter) == 0 {
                    sentence.to_string()
                } else {
                    capitalize_first(&shorter)
                }
            }
            Treatment::MinorVary => apply_phrase_rules(sentence, &lex.synonyms, 0.25, rng, true).0,
            Treatment::AddSubordinate if words < 25 => {
                append_clause(sentence, pick(rng, &lex.subordinate_clauses))
            }
            Treatment::Elaborate if words < 20 => append_clause(sentence, pick(rng, &lex.elaborations)),
            _ => sentence.to_string(),
        }
    }

    fn mix_register(&self, sentence: &str, complexity: Complexity, rng: &mut dyn RandomSource) -> String {
        let lex = &self.lexicon;
        match complexity {
            Complexity::High => apply_phrase_rules(sentence, &lex.technical_register, NOISE.register / 2.0, rng, true).0,
            Complexity::Medium => apply_phrase_rules(sentence, &lex.colloquial_register, NOISE.register, rng, true).0,
            Complexity::Low => {
                apply_phrase_rules(sentence, &lex.colloquial_register, NOISE.register + 0.1, rng, true).0
            }
        }
    }

    fn add_noise(&self, sentence: &str, rng: &mut dyn RandomSource) -> String {
        let lex = &self.lexicon;
        let mut s = sentence.to_string();

        if rng.chance(NOISE.adverb) && !opens_with_marker(&s) {
            if let Some(adverb) = pick(rng, &lex.stylistic_adverbs) {
                s = format!("{}, {}", capitalize_first(adverb), lowercase_first(&s));
            }
        }
        if rng.chance(NOISE.parenthetical) {
            if let Some(paren) = pick(rng, &lex.parentheticals) {
                let (body, terminator) = split_terminator(&s);
                s = format!("{} {}{}", body.trim_end_matches(','), paren, terminator);
            }
        }
        s
    }

    /// Join two adjacent short statements (each under 10 words) with ", and "
    fn merge_short_sentences(&self, sentences: Vec<String>, rng: &mut dyn RandomSource) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(sentences.len());
        let mut iter = sentences.into_iter().peekable();
        while let Some(current) = iter.next() {
            let mergeable = iter.peek().map(|next| {
                current.ends_with('.')
                    && !current.ends_with("..")
                    && word_count(&current) < 10
                    && word_count(next) < 10
            });
            if mergeable == Some(true) && rng.chance(NOISE.merge_short) {
                if let Some(next) = iter.next() {
                    let (body, _) = split_terminator(&current);
                    out.push(format!("{}, and {}", body, lowercase_first(&next)));
                    continue;
                }
            }
            out.push(current);
        }
        out
    }
}

fn append_clause(sentence: &str, clause: Option<&String>) -> String {
    let Some(clause) = clause else {
        return sentence.to_string();
    };
    let (body, terminator) = split_terminator(sentence);
    if terminator.contains('?') {
        return sentence.to_string();
    }
    let terminator = if terminator.is_empty() { "." } else { terminator };
    format!("{}, {}{}", body.trim_end_matches(','), clause, terminator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::randomness::{SeededRandom, SequenceRandom};

    fn reengineer() -> Reengineer {
        Reengineer::new(Lexicon::builtin())
    }

    #[test]
    fn test_treatment_bands() {
        assert_eq!(treatment_for(0.0), Treatment::Shorten);
        assert_eq!(treatment_for(0.24), Treatment::Shorten);
        assert_eq!(treatment_for(0.25), Treatment::MinorVary);
        assert_eq!(treatment_for(0.5), Treatment::AddSubordinate);
        assert_eq!(treatment_for(0.75), Treatment::Elaborate);
        assert_eq!(treatment_for(1.0), Treatment::Elaborate);
    }

    #[test]
    fn test_bias_direction() {
        assert!(complexity_bias(Complexity::High) > complexity_bias(Complexity::Medium));
        assert!(complexity_bias(Complexity::Low) < complexity_bias(Complexity::Medium));
    }

    #[test]
    fn test_rhythm_bias_follows_scanned_complexity() {
        assert_eq!(rhythm_bias(Complexity::Medium, Complexity::Medium), 0.0);
        assert!(rhythm_bias(Complexity::Medium, Complexity::High) < 0.0);
        assert!(rhythm_bias(Complexity::Medium, Complexity::Low) > 0.0);
        // the second rhythm step (0.5) drops a band for a dense source
        assert_eq!(treatment_for(0.5 + rhythm_bias(Complexity::Medium, Complexity::Medium)), Treatment::AddSubordinate);
        assert_eq!(treatment_for(0.5 + rhythm_bias(Complexity::Medium, Complexity::High)), Treatment::MinorVary);
    }

    #[test]
    fn test_dense_source_is_shortened() {
        // every draw 0.5: no noise offset and every optional gate stays shut, so
        // the second sentence lands in "minor vary" instead of gaining a clause
        let text = "We left early. We came back late.";
        let config = Configuration::default();
        let out = reengineer()
            .reengineer_from(text, Complexity::High, &config, &mut SequenceRandom::new(vec![0.5]))
            .unwrap();
        let grown = reengineer()
            .reengineer_from(text, Complexity::Medium, &config, &mut SequenceRandom::new(vec![0.5]))
            .unwrap();
        assert!(out.len() < grown.len(), "{} vs {}", out, grown);
    }

    #[test]
    fn test_shorten_keeps_facts() {
        // noise draw 0.5 -> offset 0; low bias pushes the first sentence into "shorten"
        let config = Configuration { complexity: Complexity::Low, ..Configuration::default() };
        let mut rng = SequenceRandom::new(vec![0.5, 0.999]);
        let out = reengineer()
            .reengineer("In order to win, the team of 1,200 really tried on 5/3/2024.", &config, &mut rng)
            .unwrap();
        assert!(out.contains("1,200"));
        assert!(out.contains("5/3/2024"));
        assert!(!out.contains("In order to"));
        assert!(out.ends_with('.'));
    }

    #[test]
    fn test_high_complexity_grows_text() {
        // +0.2 bias lifts the second and third sentences into the clause-adding bands
        let config = Configuration { complexity: Complexity::High, ..Configuration::default() };
        let mut rng = SequenceRandom::new(vec![0.5, 0.0, 0.999, 0.999, 0.999]);
        let sentences = "We left early. We came back. We slept well.";
        let out = reengineer().reengineer(sentences, &config, &mut rng).unwrap();
        assert!(out.len() > sentences.len());
    }

    #[test]
    fn test_merge_short_sentences() {
        let mut rng = SequenceRandom::always();
        let merged = reengineer().merge_short_sentences(
            vec!["We left early.".to_string(), "Nobody noticed.".to_string()],
            &mut rng,
        );
        assert_eq!(merged, vec!["We left early, and nobody noticed.".to_string()]);
    }

    #[test]
    fn test_merge_skips_questions_and_long_sentences() {
        let mut rng = SequenceRandom::always();
        let sentences = vec![
            "Did we leave?".to_string(),
            "This sentence is clearly far too long to be merged with anything else here.".to_string(),
            "Short one.".to_string(),
        ];
        let merged = reengineer().merge_short_sentences(sentences.clone(), &mut rng);
        assert_eq!(merged, sentences);
    }

    #[test]
    fn test_adverb_not_stacked_on_marker() {
        let mut rng = SequenceRandom::always();
        let out = reengineer().add_noise("Plus, Sarah Jones said it works.", &mut rng);
        assert!(out.starts_with("Plus, Sarah Jones said it works"), "{}", out);

        let out = reengineer().add_noise("Sarah Jones said it works.", &mut SequenceRandom::always());
        assert!(out.contains(", Sarah Jones said it works"), "{}", out);
        assert!(!out.starts_with("Sarah"), "{}", out);
    }

    #[test]
    fn test_append_clause_keeps_terminator() {
        let clause = "as you'd expect".to_string();
        assert_eq!(append_clause("It rained!", Some(&clause)), "It rained, as you'd expect!");
        assert_eq!(append_clause("Did it rain?", Some(&clause)), "Did it rain?");
        assert_eq!(append_clause("It rained.", None), "It rained.");
    }

    #[test]
    fn test_output_terminated_and_non_empty() {
        let text = "Very quickly.\n\nIn order to ship the thing we worked all night and it worked";
        for seed in 0..25 {
            let out = reengineer()
                .reengineer(text, &Configuration::default(), &mut SeededRandom::new(seed))
                .unwrap();
            assert!(!out.trim().is_empty());
            for paragraph in out.split("\n\n") {
                assert!(paragraph.ends_with(['.', '!', '?']), "seed {}: {}", seed, paragraph);
            }
        }
    }

    #[test]
    fn test_paragraphs_preserved() {
        let out = reengineer()
            .reengineer("First part here.\n\nSecond part here.", &Configuration::default(), &mut SequenceRandom::never())
            .unwrap();
        assert_eq!(out.split("\n\n").count(), 2);
    }
}
