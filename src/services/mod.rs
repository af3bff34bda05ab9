// Humanizer Core Services

pub mod error;
pub mod randomness;
pub mod lexicon;
pub mod text_processor;
pub mod config_store;
pub mod detection;
pub mod humanize;

pub use error::HumanizeError;
pub use randomness::{RandomSource, SeededRandom, SequenceRandom, SystemRandom};
pub use lexicon::Lexicon;
pub use config_store::{AppConfig, ConfigStore, ScorerSettings};

pub use detection::{is_acceptable, risk_level_for, DetectionScorer};
pub use humanize::{Orchestrator, PatternScanner};
