// Humanizer Data Models
// Plain data passed in and out of the rewriting pipeline and the detection scorer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::services::error::HumanizeError;

/// Implements `as_str`, `Display` and a strict `FromStr` for a unit-only enum.
/// Unknown strings are an `InvalidConfig` error, never a silent fallback.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = HumanizeError;

            fn from_str(val: &str) -> Result<Self, Self::Err> {
                match val.trim().to_lowercase().replace('-', "_").as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(HumanizeError::InvalidConfig(format!(
                        "unknown {} '{}'",
                        stringify!($name).to_lowercase(),
                        other
                    ))),
                }
            }
        }
    };
}

// ============ Configuration ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Adaptive,
    Casual,
    Academic,
    Creative,
    Professional,
}

string_enum!(Style {
    Adaptive => "adaptive",
    Casual => "casual",
    Academic => "academic",
    Creative => "creative",
    Professional => "professional",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

string_enum!(Complexity {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    #[default]
    Neutral,
    Positive,
    Negative,
    Enthusiastic,
    Skeptical,
    Passionate,
}

string_enum!(Emotion {
    Neutral => "neutral",
    Positive => "positive",
    Negative => "negative",
    Enthusiastic => "enthusiastic",
    Skeptical => "skeptical",
    Passionate => "passionate",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Formality {
    #[default]
    Adaptive,
    Low,
    Medium,
    High,
}

string_enum!(Formality {
    Adaptive => "adaptive",
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorLevel {
    None,
    #[default]
    Minimal,
    Moderate,
    High,
}

string_enum!(ErrorLevel {
    None => "none",
    Minimal => "minimal",
    Moderate => "moderate",
    High => "high",
});

impl ErrorLevel {
    /// Bernoulli rate per eligible token
    pub fn token_rate(&self) -> f64 {
        match self {
            ErrorLevel::None => 0.0,
            ErrorLevel::Minimal => 0.005,
            ErrorLevel::Moderate => 0.015,
            ErrorLevel::High => 0.03,
        }
    }
}

/// Settings for one `humanize` call. Treated as immutable while an attempt
/// runs; the orchestrator derives a fresh value for each refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub emotion: Emotion,
    #[serde(default)]
    pub formality: Formality,
    #[serde(default)]
    pub cultural_context: String,
    #[serde(default = "default_true")]
    pub preserve_facts: bool,
    #[serde(default)]
    pub error_level: ErrorLevel,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            style: Style::default(),
            complexity: Complexity::default(),
            emotion: Emotion::default(),
            formality: Formality::default(),
            cultural_context: String::new(),
            preserve_facts: true,
            error_level: ErrorLevel::default(),
            max_retries: default_max_retries(),
        }
    }
}

impl Configuration {
    pub fn validate(&self) -> Result<(), HumanizeError> {
        if self.max_retries < 1 {
            return Err(HumanizeError::InvalidConfig(
                "maxRetries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_error_level(mut self, error_level: ErrorLevel) -> Self {
        self.error_level = error_level;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_preserve_facts(mut self, preserve_facts: bool) -> Self {
        self.preserve_facts = preserve_facts;
        self
    }
}

// ============ Facts ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Date,
    Number,
    Entity,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactRecord {
    #[serde(rename = "type")]
    pub kind: FactKind,
    pub value: String,
}

// ============ Pattern Scanning ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalFamily {
    FormulaicTransitions,
    Hedging,
    PassiveVoice,
    StatisticalTemplates,
    AiVocabulary,
    Uniformity,
}

string_enum!(SignalFamily {
    FormulaicTransitions => "formulaic_transitions",
    Hedging => "hedging",
    PassiveVoice => "passive_voice",
    StatisticalTemplates => "statistical_templates",
    AiVocabulary => "ai_vocabulary",
    Uniformity => "uniformity",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalHit {
    pub family: SignalFamily,
    pub match_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub sentences: Vec<String>,
    pub signals: Vec<SignalHit>,
    pub complexity_level: Complexity,
    /// One unit per entry of `sentences`, in the same order
    #[serde(default)]
    pub units: Vec<SemanticUnit>,
}

impl ScanResult {
    pub fn empty() -> Self {
        Self {
            sentences: Vec::new(),
            signals: Vec::new(),
            complexity_level: Complexity::Low,
            units: Vec::new(),
        }
    }

    pub fn signal_count(&self, family: SignalFamily) -> usize {
        self.signals
            .iter()
            .filter(|s| s.family == family)
            .map(|s| s.match_count)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tense {
    Past,
    Present,
    Future,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voice {
    Active,
    Passive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticRole {
    Statement,
    Question,
    Exclamation,
    Transition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TextSpan {
    /// UTF-8 byte offset (0-based) into the sentence.
    pub start: usize,
    /// UTF-8 byte offset (0-based, end-exclusive) into the sentence.
    pub end: usize,
}

impl TextSpan {
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start..self.end).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One sentence plus the lexical attributes derived for it. Lives only for
/// the duration of a single attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticUnit {
    pub text: String,
    /// Index of the paragraph the sentence came from
    pub paragraph: usize,
    pub subject: TextSpan,
    pub predicate: TextSpan,
    pub tense: Tense,
    pub voice: Voice,
    pub role: SemanticRole,
}

// ============ Detection ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    ExtremelyHigh,
}

string_enum!(RiskLevel {
    Minimal => "minimal",
    Low => "low",
    Medium => "medium",
    High => "high",
    ExtremelyHigh => "extremely_high",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionAnalysis {
    pub overall_score: f64,
    pub per_family_scores: BTreeMap<SignalFamily, f64>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub explanations: Vec<String>,
}

// ============ Pipeline Result ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Accepted,
    MaxRetriesReached,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub attempt: u32,
    pub style: Style,
    pub error_level: ErrorLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Variance of sentence lengths (in words) before and after rewriting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BurstinessMetrics {
    pub before: f64,
    pub after: f64,
    pub improvement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetadata {
    pub status: PipelineStatus,
    pub attempts: u32,
    pub request_id: String,
    pub original_analysis: DetectionAnalysis,
    pub final_analysis: DetectionAnalysis,
    #[serde(default)]
    pub facts: Vec<FactRecord>,
    #[serde(default)]
    pub missing_facts: Vec<String>,
    pub burstiness: BurstinessMetrics,
    #[serde(default)]
    pub attempt_log: Vec<AttemptSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub success: bool,
    pub humanized_text: String,
    pub confidence_score: f64,
    pub detection_risk: RiskLevel,
    pub attempts: u32,
    pub processing_time_ms: u64,
    pub metadata: PipelineMetadata,
}

// ============ Default Value Functions ============

fn default_true() -> bool { true }
fn default_max_retries() -> u32 { 3 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_defaults_from_partial_json() {
        let config: Configuration = serde_json::from_str(r#"{"style":"casual"}"#).unwrap();
        assert_eq!(config.style, Style::Casual);
        assert_eq!(config.max_retries, 3);
        assert!(config.preserve_facts);
        assert_eq!(config.error_level, ErrorLevel::Minimal);
    }

    #[test]
    fn test_configuration_camel_case_round_trip() {
        let config = Configuration::default().with_error_level(ErrorLevel::High);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"errorLevel\":\"high\""));
        assert!(json.contains("\"culturalContext\""));
    }

    #[test]
    fn test_enum_parsing_is_strict() {
        assert_eq!("Academic".parse::<Style>().unwrap(), Style::Academic);
        assert_eq!("extremely-high".parse::<RiskLevel>().unwrap(), RiskLevel::ExtremelyHigh);
        let err = "poetic".parse::<Style>().unwrap_err();
        assert!(matches!(err, HumanizeError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        assert!(Configuration::default().with_max_retries(0).validate().is_err());
        assert!(Configuration::default().with_max_retries(1).validate().is_ok());
    }

    #[test]
    fn test_risk_levels_are_ordered() {
        assert!(RiskLevel::Minimal < RiskLevel::Low);
        assert!(RiskLevel::High < RiskLevel::ExtremelyHigh);
    }

    #[test]
    fn test_family_scores_serialize_with_string_keys() {
        let mut per_family_scores = BTreeMap::new();
        per_family_scores.insert(SignalFamily::Hedging, 40.0);
        let analysis = DetectionAnalysis {
            overall_score: 8.0,
            per_family_scores,
            risk_level: RiskLevel::Minimal,
            explanations: vec![],
        };
        let json = serde_json::to_string(&analysis).unwrap();
        assert!(json.contains("\"hedging\":40.0"));
        assert!(json.contains("\"riskLevel\":\"minimal\""));
    }

    #[test]
    fn test_fact_record_uses_type_key() {
        let fact = FactRecord { kind: FactKind::Date, value: "5/3/2024".to_string() };
        let json = serde_json::to_string(&fact).unwrap();
        assert_eq!(json, r#"{"type":"date","value":"5/3/2024"}"#);
    }
}
