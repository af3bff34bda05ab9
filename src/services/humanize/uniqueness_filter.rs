// Uniqueness Filter
// Paraphrases ~75-word chunks that overlap heavily with known AI-cliche phrasing.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::services::error::{ensure_non_empty, HumanizeError};
use crate::services::lexicon::Lexicon;
use crate::services::randomness::RandomSource;
use crate::services::text_processor::{apply_phrase_rules, token_set};

const STAGE: &str = "uniqueness_filter";

pub const DEFAULT_CHUNK_WORDS: usize = 75;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
const SYNONYM_FALLBACK_RATE: f64 = 0.5;

fn token_span_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S+").expect("token span regex"))
}

/// Intersection over union of lowercase token sets
pub fn token_iou(a: &str, b: &str) -> f64 {
    let left = token_set(a);
    let right = token_set(b);
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

/// Byte ranges of consecutive `size`-word chunks. Whitespace between chunks
/// stays outside every range; chunks may end mid-sentence.
pub fn chunk_ranges(text: &str, size: usize) -> Vec<(usize, usize)> {
    let spans: Vec<(usize, usize)> = token_span_re()
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    spans
        .chunks(size.max(1))
        .filter_map(|chunk| Some((chunk.first()?.0, chunk.last()?.1)))
        .collect()
}

pub struct UniquenessFilter {
    lexicon: Arc<Lexicon>,
    chunk_words: usize,
    threshold: f64,
}

impl UniquenessFilter {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self {
            lexicon,
            chunk_words: DEFAULT_CHUNK_WORDS,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Highest IoU between `chunk` and any corpus phrase
    pub fn similarity(&self, chunk: &str) -> f64 {
        self.lexicon
            .ai_cliches
            .iter()
            .map(|cliche| token_iou(chunk, cliche))
            .fold(0.0, f64::max)
    }

    /// Rewrite chunks whose similarity exceeds the threshold: canonical
    /// paraphrases first, synonym substitution when none applies. Performs
    /// no I/O; async so a remote paraphraser can slot in later.
    pub async fn ensure_uniqueness(
        &self,
        text: &str,
        rng: &mut dyn RandomSource,
    ) -> Result<String, HumanizeError> {
        let ranges = chunk_ranges(text, self.chunk_words);
        let mut output = String::with_capacity(text.len());
        let mut cursor = 0usize;
        let mut rewritten = 0usize;

        for (start, end) in ranges {
            output.push_str(&text[cursor..start]);
            let chunk = &text[start..end];
            let score = self.similarity(chunk);
            if score > self.threshold {
                output.push_str(&self.paraphrase(chunk, rng));
                rewritten += 1;
            } else {
                output.push_str(chunk);
            }
            cursor = end;
            tokio::task::yield_now().await;
        }
        output.push_str(&text[cursor..]);

        debug!(rewritten_chunks = rewritten, "[UNIQUENESS] chunks checked");
        ensure_non_empty(STAGE, text, output)
    }

    fn paraphrase(&self, chunk: &str, rng: &mut dyn RandomSource) -> String {
        let (out, replaced) = apply_phrase_rules(chunk, &self.lexicon.paraphrases, 1.0, rng, true);
        if replaced > 0 {
            return out;
        }
        apply_phrase_rules(chunk, &self.lexicon.synonyms, SYNONYM_FALLBACK_RATE, rng, true).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::randomness::SequenceRandom;

    fn filter() -> UniquenessFilter {
        UniquenessFilter::new(Lexicon::builtin())
    }

    #[test]
    fn test_token_iou() {
        assert_eq!(token_iou("a b c", "a b c"), 1.0);
        assert_eq!(token_iou("A, b.", "a b c d"), 0.5);
        assert_eq!(token_iou("", ""), 0.0);
    }

    #[test]
    fn test_chunk_ranges_cover_all_words() {
        let text = "one two three\n\nfour five";
        let ranges = chunk_ranges(text, 2);
        let chunks: Vec<&str> = ranges.iter().map(|&(s, e)| &text[s..e]).collect();
        assert_eq!(chunks, vec!["one two", "three\n\nfour", "five"]);
        assert!(chunk_ranges("   ", 75).is_empty());
    }

    #[tokio::test]
    async fn test_cliche_chunk_is_paraphrased() {
        let text = "In conclusion, the implementation of advanced methodologies demonstrates significant improvements.";
        assert!(filter().similarity(text) > 0.7);

        let out = filter().ensure_uniqueness(text, &mut SequenceRandom::always()).await.unwrap();
        assert_ne!(out, text);
        assert!(out.starts_with("To wrap things up"), "{}", out);
        assert!(out.contains("rolling out"), "{}", out);
    }

    #[tokio::test]
    async fn test_original_text_passes_through() {
        let text = "We drove to the coast on Friday and the fog never lifted.\n\nStill worth it.";
        assert!(filter().similarity(text) < 0.7);
        let out = filter().ensure_uniqueness(text, &mut SequenceRandom::always()).await.unwrap();
        assert_eq!(out, text);
    }

    #[tokio::test]
    async fn test_synonym_fallback_when_no_paraphrase() {
        let lexicon = Lexicon::from_json(
            r#"{"aiCliches":["the results show clear benefits"],"synonyms":{"benefits":["perks"]}}"#,
        )
        .unwrap();
        let out = UniquenessFilter::new(Arc::new(lexicon))
            .ensure_uniqueness("The results show clear benefits.", &mut SequenceRandom::always())
            .await
            .unwrap();
        assert_eq!(out, "The results show clear perks.");
    }

    #[tokio::test]
    async fn test_threshold_controls_rewrites() {
        let text = "In conclusion, the implementation of advanced methodologies demonstrates significant improvements.";
        let out = filter()
            .with_threshold(1.0)
            .ensure_uniqueness(text, &mut SequenceRandom::always())
            .await
            .unwrap();
        assert_eq!(out, text);
    }

    #[tokio::test]
    async fn test_empty_text() {
        let out = filter().ensure_uniqueness("", &mut SequenceRandom::always()).await.unwrap();
        assert_eq!(out, "");
    }
}
