// Error Taxonomy
// Typed errors raised by the rewriting pipeline and its data loaders

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HumanizeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: &'static str, message: String },
    #[error("lexicon error: {0}")]
    Lexicon(String),
}

impl HumanizeError {
    pub fn stage(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used in attempt logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "input_error",
            Self::InvalidConfig(_) => "config_error",
            Self::Stage { .. } => "stage_error",
            Self::Lexicon(_) => "lexicon_error",
        }
    }
}

impl From<regex::Error> for HumanizeError {
    fn from(err: regex::Error) -> Self {
        Self::Lexicon(format!("pattern failed to compile: {}", err))
    }
}

impl From<serde_json::Error> for HumanizeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Lexicon(format!("failed to parse lexicon: {}", err))
    }
}

/// Reject empty output produced from non-empty input.
pub fn ensure_non_empty(stage: &'static str, input: &str, output: String) -> Result<String, HumanizeError> {
    if !input.trim().is_empty() && output.trim().is_empty() {
        return Err(HumanizeError::stage(stage, "produced empty output for non-empty input"));
    }
    Ok(output)
}
