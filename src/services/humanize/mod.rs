// Humanize Module
// Rewriting pipeline organized into one submodule per stage:
// - fact_guard: fact extraction and post-rewrite presence check
// - pattern_scanner: segmentation, signal hits, semantic units
// - style_synthesizer: voice-driven sentence rewrites
// - reengineer: rhythm model, register mixing, stylistic noise
// - uniqueness_filter: cliche-chunk paraphrasing
// - obfuscator: ordered surface perturbation passes
// - human_verifier: smoothing and calibrated human slips
// - orchestrator: retry state machine

pub mod fact_guard;
pub mod pattern_scanner;
pub mod style_synthesizer;
pub mod reengineer;
pub mod uniqueness_filter;
pub mod obfuscator;
pub mod human_verifier;
pub mod orchestrator;

pub use fact_guard::{extract as extract_facts, reinject as reinject_facts, Reinjection};
pub use pattern_scanner::PatternScanner;
pub use style_synthesizer::{resolve_style, StyleSynthesizer};
pub use reengineer::Reengineer;
pub use uniqueness_filter::UniquenessFilter;
pub use obfuscator::{ObfuscationPass, Obfuscator, PASS_ORDER};
pub use human_verifier::HumanVerifier;
pub use orchestrator::{refine_configuration, AttemptOutput, AttemptRunner, Orchestrator, StagePipeline};
