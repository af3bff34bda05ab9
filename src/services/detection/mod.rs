// Detection Module
// Heuristic AI-likeness scoring organized into specialized submodules:
// - signals: per-family matchers shared with the pattern scanner
// - risk: score to risk-tier thresholds
// - scorer: weighted combination of family scores

pub mod signals;
pub mod risk;
pub mod scorer;

// Re-export commonly used functions
pub use signals::{count_family, detect_signals, is_passive, passive_sentence_count, LEXICAL_FAMILIES};
pub use risk::{is_acceptable, risk_level_for, RiskThresholds, RISK_THRESHOLDS};
pub use scorer::{default_family_weights, DetectionScorer};
