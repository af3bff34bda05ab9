// Orchestrator
// Retry state machine around the stage pipeline:
// Attempting(n) -> Scored -> Accepted | Refining(n+1) | Exhausted

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    AttemptSummary, BurstinessMetrics, Configuration, DetectionAnalysis, ErrorLevel, FactRecord,
    PipelineMetadata, PipelineResult, PipelineStatus, SemanticUnit, Style,
};
use crate::services::detection::{is_acceptable, DetectionScorer};
use crate::services::error::HumanizeError;
use crate::services::humanize::fact_guard;
use crate::services::humanize::human_verifier::HumanVerifier;
use crate::services::humanize::obfuscator::Obfuscator;
use crate::services::humanize::pattern_scanner::PatternScanner;
use crate::services::humanize::reengineer::Reengineer;
use crate::services::humanize::style_synthesizer::StyleSynthesizer;
use crate::services::humanize::uniqueness_filter::UniquenessFilter;
use crate::services::lexicon::Lexicon;
use crate::services::randomness::RandomSource;
use crate::services::text_processor::{burstiness, join_paragraphs, normalize_punctuation};

const STAGE: &str = "orchestrator";

/// Text produced by one attempt plus the facts it failed to keep
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutput {
    pub text: String,
    pub missing_facts: Vec<String>,
}

/// One full pass of the rewriting stages. The retry loop only sees this
/// seam, so tests can drive it with scripted outputs.
#[async_trait]
pub trait AttemptRunner: Send {
    async fn run_attempt(
        &mut self,
        text: &str,
        config: &Configuration,
        facts: &[FactRecord],
    ) -> Result<AttemptOutput, HumanizeError>;
}

/// Configuration for attempt `next_attempt` (2-based): attempt 2 goes
/// creative with moderate errors, attempt 3 onwards casual with high errors.
pub fn refine_configuration(previous: &Configuration, next_attempt: u32) -> Configuration {
    match next_attempt {
        0 | 1 => previous.clone(),
        2 => previous
            .clone()
            .with_style(Style::Creative)
            .with_error_level(ErrorLevel::Moderate),
        _ => previous
            .clone()
            .with_style(Style::Casual)
            .with_error_level(ErrorLevel::High),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Put rewritten sentences back into the paragraphs their units came from
fn regroup(units: &[SemanticUnit], sentences: Vec<String>) -> Vec<Vec<String>> {
    if units.len() != sentences.len() {
        return vec![sentences];
    }
    let mut paragraphs: Vec<Vec<String>> = Vec::new();
    let mut current: Option<usize> = None;
    for (unit, sentence) in units.iter().zip(sentences) {
        if current != Some(unit.paragraph) {
            paragraphs.push(Vec::new());
            current = Some(unit.paragraph);
        }
        if let Some(last) = paragraphs.last_mut() {
            last.push(sentence);
        }
    }
    paragraphs
}

/// Production runner: every stage in fixed order, drawing from one source
pub struct StagePipeline<'r> {
    scanner: PatternScanner,
    synthesizer: StyleSynthesizer,
    reengineer: Reengineer,
    uniqueness: UniquenessFilter,
    obfuscator: Obfuscator,
    verifier: HumanVerifier,
    rng: &'r mut dyn RandomSource,
}

impl<'r> StagePipeline<'r> {
    pub fn new(lexicon: Arc<Lexicon>, rng: &'r mut dyn RandomSource) -> Self {
        Self {
            scanner: PatternScanner::new(lexicon.clone()),
            synthesizer: StyleSynthesizer::new(lexicon.clone()),
            reengineer: Reengineer::new(lexicon.clone()),
            uniqueness: UniquenessFilter::new(lexicon.clone()),
            obfuscator: Obfuscator::new(lexicon.clone()),
            verifier: HumanVerifier::new(lexicon),
            rng,
        }
    }
}

#[async_trait]
impl<'r> AttemptRunner for StagePipeline<'r> {
    async fn run_attempt(
        &mut self,
        text: &str,
        config: &Configuration,
        facts: &[FactRecord],
    ) -> Result<AttemptOutput, HumanizeError> {
        let scan = self.scanner.scan(text);
        let sentences = self.synthesizer.synthesize(&scan, config, &mut *self.rng)?;
        let synthesized = join_paragraphs(&regroup(&scan.units, sentences));

        let reengineered =
            self.reengineer
                .reengineer_from(&synthesized, scan.complexity_level, config, &mut *self.rng)?;
        let unique = self.uniqueness.ensure_uniqueness(&reengineered, &mut *self.rng).await?;
        let obfuscated = self.obfuscator.obfuscate(&unique, &mut *self.rng)?;
        let verified = self.verifier.verify(&obfuscated, config.error_level, &mut *self.rng)?;

        if !config.preserve_facts {
            return Ok(AttemptOutput {
                text: verified,
                missing_facts: Vec::new(),
            });
        }
        let checked = fact_guard::reinject(&verified, facts);
        Ok(AttemptOutput {
            text: checked.text,
            missing_facts: checked.missing,
        })
    }
}

struct Candidate {
    output: AttemptOutput,
    analysis: DetectionAnalysis,
}

pub struct Orchestrator {
    lexicon: Arc<Lexicon>,
    scorer: DetectionScorer,
}

impl Orchestrator {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self {
            scorer: DetectionScorer::new(lexicon.clone()),
            lexicon,
        }
    }

    pub fn with_scorer(lexicon: Arc<Lexicon>, scorer: DetectionScorer) -> Self {
        Self { lexicon, scorer }
    }

    pub fn scorer(&self) -> &DetectionScorer {
        &self.scorer
    }

    /// Rewrite `text` through the full stage pipeline
    pub async fn humanize(
        &self,
        text: &str,
        config: &Configuration,
        rng: &mut dyn RandomSource,
    ) -> Result<PipelineResult, HumanizeError> {
        let mut pipeline = StagePipeline::new(self.lexicon.clone(), rng);
        self.drive(text, config, &mut pipeline).await
    }

    /// Run the retry loop against any [`AttemptRunner`].
    ///
    /// Each attempt after the first refines the configuration and rewrites
    /// the previous attempt's output. An attempt whose risk is minimal or
    /// low is accepted; otherwise the lowest-scoring attempt is returned
    /// once `max_retries` is spent. A stage error is retried unless it
    /// happened on the final attempt.
    pub async fn drive<A: AttemptRunner>(
        &self,
        text: &str,
        config: &Configuration,
        runner: &mut A,
    ) -> Result<PipelineResult, HumanizeError> {
        let started = Instant::now();
        if text.trim().is_empty() {
            return Err(HumanizeError::InvalidInput("text is empty".to_string()));
        }
        config.validate()?;

        let request_id = Uuid::new_v4().to_string();
        let original = normalize_punctuation(text);
        let facts = fact_guard::extract(&original);
        let original_analysis = self.scorer.analyze(&original);
        let burstiness_before = burstiness(&original);

        info!(
            request_id = %request_id,
            score = original_analysis.overall_score,
            risk = %original_analysis.risk_level,
            facts = facts.len(),
            max_retries = config.max_retries,
            "[ORCHESTRATOR] request started"
        );

        let mut current_config = config.clone();
        let mut current_text = original.clone();
        let mut best: Option<Candidate> = None;
        let mut attempt_log = Vec::new();
        let mut status = PipelineStatus::MaxRetriesReached;
        let mut attempts = 0u32;

        for attempt in 1..=config.max_retries {
            attempts = attempt;
            if attempt > 1 {
                current_config = refine_configuration(&current_config, attempt);
                debug!(
                    attempt,
                    style = %current_config.style,
                    error_level = %current_config.error_level,
                    "[ORCHESTRATOR] configuration refined"
                );
            }

            let output = match runner.run_attempt(&current_text, &current_config, &facts).await {
                Ok(output) => output,
                Err(err) => {
                    if attempt == config.max_retries {
                        warn!(attempt, error = %err, "[ORCHESTRATOR] final attempt failed");
                        return Err(err);
                    }
                    warn!(attempt, kind = err.kind(), error = %err, "[ORCHESTRATOR] attempt failed, retrying");
                    attempt_log.push(AttemptSummary {
                        attempt,
                        style: current_config.style,
                        error_level: current_config.error_level,
                        overall_score: None,
                        risk_level: None,
                        error: Some(err.to_string()),
                    });
                    continue;
                }
            };

            let analysis = self.scorer.analyze(&output.text);
            info!(
                request_id = %request_id,
                attempt,
                score = analysis.overall_score,
                risk = %analysis.risk_level,
                style = %current_config.style,
                "[ORCHESTRATOR] attempt scored"
            );
            attempt_log.push(AttemptSummary {
                attempt,
                style: current_config.style,
                error_level: current_config.error_level,
                overall_score: Some(analysis.overall_score),
                risk_level: Some(analysis.risk_level),
                error: None,
            });

            current_text = output.text.clone();
            let accepted = is_acceptable(analysis.risk_level);
            let improves = best
                .as_ref()
                .map(|b| analysis.overall_score < b.analysis.overall_score)
                .unwrap_or(true);
            if accepted || improves {
                best = Some(Candidate { output, analysis });
            }
            if accepted {
                status = PipelineStatus::Accepted;
                break;
            }
        }

        let Some(best) = best else {
            return Err(HumanizeError::stage(STAGE, "no attempt produced output"));
        };

        let burstiness_after = burstiness(&best.output.text);
        let processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            request_id = %request_id,
            attempts,
            status = ?status,
            score = best.analysis.overall_score,
            risk = %best.analysis.risk_level,
            elapsed_ms = processing_time_ms,
            "[ORCHESTRATOR] request finished"
        );

        Ok(PipelineResult {
            success: true,
            confidence_score: round2(100.0 - best.analysis.overall_score),
            detection_risk: best.analysis.risk_level,
            humanized_text: best.output.text,
            attempts,
            processing_time_ms,
            metadata: PipelineMetadata {
                status,
                attempts,
                request_id,
                original_analysis,
                final_analysis: best.analysis,
                facts,
                missing_facts: best.output.missing_facts,
                burstiness: BurstinessMetrics {
                    before: round2(burstiness_before),
                    after: round2(burstiness_after),
                    improvement: round2(burstiness_after - burstiness_before),
                },
                attempt_log,
            },
        })
    }
}
