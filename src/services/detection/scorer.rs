// Detection Scorer
// Heuristic AI-likeness score: independent family scores (each capped at 100)
// combined by a fixed weighted sum, then mapped to a risk tier.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::{DetectionAnalysis, SignalFamily};
use crate::services::detection::risk::risk_level_for;
use crate::services::detection::signals::{count_family, passive_sentence_count};
use crate::services::error::HumanizeError;
use crate::services::lexicon::Lexicon;
use crate::services::text_processor::{
    compute_stylometry, normalize_punctuation, split_paragraph_sentences, word_count,
};

/// Coefficient of variation at which sentence lengths stop counting as uniform
const UNIFORMITY_CV_CEILING: f64 = 0.6;

pub fn default_family_weights() -> BTreeMap<SignalFamily, f64> {
    BTreeMap::from([
        (SignalFamily::FormulaicTransitions, 0.25),
        (SignalFamily::Hedging, 0.20),
        (SignalFamily::PassiveVoice, 0.15),
        (SignalFamily::StatisticalTemplates, 0.20),
        (SignalFamily::AiVocabulary, 0.10),
        (SignalFamily::Uniformity, 0.10),
    ])
}

/// Points per match per sentence, before the 100 cap
fn density_multiplier(family: SignalFamily) -> f64 {
    match family {
        SignalFamily::FormulaicTransitions | SignalFamily::Hedging => 100.0,
        SignalFamily::StatisticalTemplates => 80.0,
        SignalFamily::AiVocabulary => 50.0,
        SignalFamily::PassiveVoice | SignalFamily::Uniformity => 100.0,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone)]
pub struct DetectionScorer {
    lexicon: Arc<Lexicon>,
    weights: BTreeMap<SignalFamily, f64>,
}

impl DetectionScorer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self {
            lexicon,
            weights: default_family_weights(),
        }
    }

    /// Scorer with custom family weights. Weights must be finite and
    /// non-negative with a positive sum; they are renormalised to sum 1.
    /// Families left out get weight 0.
    pub fn with_weights(
        lexicon: Arc<Lexicon>,
        weights: &BTreeMap<SignalFamily, f64>,
    ) -> Result<Self, HumanizeError> {
        if let Some((family, w)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            return Err(HumanizeError::InvalidConfig(format!(
                "weight for {} must be a non-negative number, got {}",
                family, w
            )));
        }
        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            return Err(HumanizeError::InvalidConfig(
                "family weights must sum to more than 0".to_string(),
            ));
        }
        let weights = SignalFamily::ALL
            .iter()
            .map(|&family| (family, weights.get(&family).copied().unwrap_or(0.0) / total))
            .collect();
        Ok(Self { lexicon, weights })
    }

    pub fn weights(&self) -> &BTreeMap<SignalFamily, f64> {
        &self.weights
    }

    /// Score `text`. Pure: the same text always yields the same analysis.
    pub fn analyze(&self, text: &str) -> DetectionAnalysis {
        let normalized = normalize_punctuation(text);
        let sentences: Vec<String> = split_paragraph_sentences(&normalized)
            .into_iter()
            .flatten()
            .filter(|s| word_count(s) > 0)
            .collect();

        let mut per_family_scores = BTreeMap::new();
        if sentences.is_empty() {
            for &family in SignalFamily::ALL {
                per_family_scores.insert(family, 0.0);
            }
            return DetectionAnalysis {
                overall_score: 0.0,
                per_family_scores,
                risk_level: risk_level_for(0.0),
                explanations: Vec::new(),
            };
        }

        let n = sentences.len() as f64;
        let mut explanations = Vec::new();
        let mut overall = 0.0;

        for &family in SignalFamily::ALL {
            let (hits, score) = match family {
                SignalFamily::PassiveVoice => {
                    let hits = passive_sentence_count(&sentences);
                    (hits, hits as f64 / n * density_multiplier(family))
                }
                SignalFamily::Uniformity => (0, self.uniformity_score(&normalized, sentences.len())),
                _ => {
                    let hits = count_family(&self.lexicon, family, &normalized);
                    (hits, hits as f64 / n * density_multiplier(family))
                }
            };
            let score = round2(score.clamp(0.0, 100.0));
            let weight = self.weights.get(&family).copied().unwrap_or(0.0);
            let contrib = score * weight;
            overall += contrib;

            if score > 0.0 {
                if family == SignalFamily::Uniformity {
                    explanations.push(format!("{} score={:.1} contrib={:.2}", family, score, contrib));
                } else {
                    explanations.push(format!("{} hits={} score={:.1} contrib={:.2}", family, hits, score, contrib));
                }
            }
            per_family_scores.insert(family, score);
        }

        let overall_score = round2(overall.clamp(0.0, 100.0));
        DetectionAnalysis {
            overall_score,
            per_family_scores,
            risk_level: risk_level_for(overall_score),
            explanations,
        }
    }

    /// 70% sentence-length uniformity, 30% 3-gram repetition
    fn uniformity_score(&self, text: &str, sentence_count: usize) -> f64 {
        let metrics = compute_stylometry(text);
        let length_uniformity = if sentence_count <= 1 {
            100.0
        } else {
            (100.0 * (1.0 - metrics.sentence_len_cv / UNIFORMITY_CV_CEILING)).clamp(0.0, 100.0)
        };
        let repetition = (metrics.ngram_repeat_rate * 100.0).clamp(0.0, 100.0);
        0.7 * length_uniformity + 0.3 * repetition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;

    const SCENARIO: &str =
        "In conclusion, the implementation of advanced methodologies demonstrates significant improvements.";

    fn scorer() -> DetectionScorer {
        DetectionScorer::new(Lexicon::builtin())
    }

    #[test]
    fn test_scenario_scores_high() {
        let analysis = scorer().analyze(SCENARIO);
        assert_eq!(analysis.per_family_scores[&SignalFamily::FormulaicTransitions], 100.0);
        assert_eq!(analysis.per_family_scores[&SignalFamily::StatisticalTemplates], 100.0);
        assert_eq!(analysis.per_family_scores[&SignalFamily::AiVocabulary], 100.0);
        assert_eq!(analysis.per_family_scores[&SignalFamily::Uniformity], 70.0);
        assert!((analysis.overall_score - 62.0).abs() < 1e-9);
        assert_eq!(analysis.risk_level, RiskLevel::High);
        assert!(!analysis.explanations.is_empty());
    }

    #[test]
    fn test_removing_transition_lowers_tier() {
        let analysis = scorer().analyze(
            "The implementation of advanced methodologies demonstrates significant improvements.",
        );
        assert!((analysis.overall_score - 37.0).abs() < 1e-9);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_casual_text_is_minimal() {
        let analysis = scorer().analyze(
            "I went to the store yesterday. The place was packed, so I gave up and drove home! Pasta again tonight, I guess.",
        );
        assert!(analysis.overall_score < 20.0, "score {}", analysis.overall_score);
        assert_eq!(analysis.risk_level, RiskLevel::Minimal);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        for text in ["", "   \n\t "] {
            let analysis = scorer().analyze(text);
            assert_eq!(analysis.overall_score, 0.0);
            assert_eq!(analysis.risk_level, RiskLevel::Minimal);
            assert_eq!(analysis.per_family_scores.len(), SignalFamily::ALL.len());
        }
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let s = scorer();
        let first = s.analyze(SCENARIO);
        for _ in 0..5 {
            assert_eq!(s.analyze(SCENARIO), first);
        }
    }

    #[test]
    fn test_family_scores_are_capped() {
        let text = "Furthermore, moreover, additionally, however, therefore, thus, hence.";
        let analysis = scorer().analyze(text);
        assert_eq!(analysis.per_family_scores[&SignalFamily::FormulaicTransitions], 100.0);
        assert!(analysis.overall_score <= 100.0);
    }

    #[test]
    fn test_custom_weights_renormalise() {
        let weights = BTreeMap::from([(SignalFamily::FormulaicTransitions, 2.0)]);
        let s = DetectionScorer::with_weights(Lexicon::builtin(), &weights).unwrap();
        assert!((s.weights()[&SignalFamily::FormulaicTransitions] - 1.0).abs() < 1e-12);
        assert_eq!(s.weights()[&SignalFamily::Hedging], 0.0);
        assert_eq!(s.analyze(SCENARIO).overall_score, 100.0);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let negative = BTreeMap::from([(SignalFamily::Hedging, -0.1)]);
        assert!(matches!(
            DetectionScorer::with_weights(Lexicon::builtin(), &negative),
            Err(HumanizeError::InvalidConfig(_))
        ));
        let zero = BTreeMap::from([(SignalFamily::Hedging, 0.0)]);
        assert!(DetectionScorer::with_weights(Lexicon::builtin(), &zero).is_err());
    }
}
