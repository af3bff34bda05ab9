// Lexicon
// Phrase tables shared by the rewriting stages and the detection scorer.
// The tables ship as data/lexicon.json and are compiled once into regex rules.

use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::models::{Emotion, SignalFamily, Style};
use crate::services::error::HumanizeError;

type PhraseMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LexiconFile {
    version: String,
    rhythm_pattern: Vec<f64>,
    transitions: Vec<String>,
    hedges: Vec<String>,
    statistical_templates: Vec<String>,
    ai_vocabulary: Vec<String>,
    ai_cliches: Vec<String>,
    paraphrases: PhraseMap,
    synonyms: PhraseMap,
    formal_to_informal: PhraseMap,
    informal_to_formal: PhraseMap,
    contractions: PhraseMap,
    fillers: PhraseMap,
    emotion_markers: PhraseMap,
    technical_register: PhraseMap,
    colloquial_register: PhraseMap,
    stylistic_adverbs: Vec<String>,
    rhetorical_questions: Vec<String>,
    parentheticals: Vec<String>,
    subordinate_clauses: Vec<String>,
    elaborations: Vec<String>,
    syntactic_jitter: PhraseMap,
    discourse_markers: Vec<DiscourseMarkerFile>,
    personal_voice: Vec<String>,
    adversarial_asides: Vec<String>,
    spelling_variants: Vec<(String, String)>,
    typos: PhraseMap,
    grammar_slips: PhraseMap,
    uk_spellings: PhraseMap,
    concise_phrases: PhraseMap,
}

#[derive(Debug, Default, Deserialize)]
struct DiscourseMarkerFile {
    name: String,
    triggers: Vec<String>,
    replacements: Vec<String>,
}

/// A phrase and the alternatives it may be rewritten to.
#[derive(Debug, Clone)]
pub struct PhraseRule {
    pub phrase: String,
    /// Case-insensitive, word-bounded, whitespace-tolerant match for `phrase`
    pub pattern: Regex,
    pub alternatives: Vec<String>,
}

/// Sentence-opening markers of one discourse function (addition, contrast, ...)
#[derive(Debug, Clone)]
pub struct DiscourseGroup {
    pub name: String,
    /// Matches a trigger at the start of a sentence, with its trailing comma
    pub opener: Regex,
    pub replacements: Vec<String>,
}

#[derive(Debug)]
pub struct Lexicon {
    pub version: String,
    pub rhythm_pattern: Vec<f64>,
    pub transitions: Vec<String>,
    pub hedges: Vec<String>,
    pub ai_vocabulary: Vec<String>,
    pub ai_cliches: Vec<String>,
    family_patterns: HashMap<SignalFamily, Vec<Regex>>,

    pub paraphrases: Vec<PhraseRule>,
    pub synonyms: Vec<PhraseRule>,
    synonym_index: HashMap<String, usize>,
    pub formal_to_informal: Vec<PhraseRule>,
    pub informal_to_formal: Vec<PhraseRule>,
    pub contractions: Vec<PhraseRule>,
    pub expansions: Vec<PhraseRule>,
    pub technical_register: Vec<PhraseRule>,
    pub colloquial_register: Vec<PhraseRule>,
    pub syntactic_jitter: Vec<PhraseRule>,
    pub typos: Vec<PhraseRule>,
    pub grammar_slips: Vec<PhraseRule>,
    pub uk_spellings: Vec<PhraseRule>,
    pub concise_phrases: Vec<PhraseRule>,
    pub spelling_variants: Vec<PhraseRule>,

    fillers: HashMap<Style, Vec<String>>,
    emotion_markers: HashMap<Emotion, Vec<String>>,

    pub stylistic_adverbs: Vec<String>,
    pub rhetorical_questions: Vec<String>,
    pub parentheticals: Vec<String>,
    pub subordinate_clauses: Vec<String>,
    pub elaborations: Vec<String>,
    pub discourse_markers: Vec<DiscourseGroup>,
    pub personal_voice: Vec<String>,
    pub adversarial_asides: Vec<String>,
}

static BUILTIN: OnceLock<Arc<Lexicon>> = OnceLock::new();

/// Escape a phrase and let its spaces match any whitespace run
fn phrase_source(phrase: &str) -> String {
    regex::escape(phrase.trim()).replace(' ', r"\s+")
}

fn bounded(phrase: &str, body: &str) -> String {
    let lead = if phrase.chars().next().map(|c| c.is_alphanumeric()).unwrap_or(false) { r"\b" } else { "" };
    let tail = if phrase.chars().last().map(|c| c.is_alphanumeric()).unwrap_or(false) { r"\b" } else { "" };
    format!("{}{}{}", lead, body, tail)
}

/// Compile a phrase map into rules, longest phrase first so multi-word
/// phrases win over their single-word parts.
pub fn compile_rules(map: &BTreeMap<String, Vec<String>>) -> Result<Vec<PhraseRule>, HumanizeError> {
    let mut rules = Vec::with_capacity(map.len());
    for (phrase, alternatives) in map {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            continue;
        }
        let pattern = Regex::new(&format!("(?i){}", bounded(phrase, &phrase_source(phrase))))?;
        rules.push(PhraseRule {
            phrase: phrase.to_lowercase(),
            pattern,
            alternatives: alternatives.clone(),
        });
    }
    rules.sort_by(|a, b| b.phrase.len().cmp(&a.phrase.len()).then_with(|| a.phrase.cmp(&b.phrase)));
    Ok(rules)
}

/// One case-insensitive alternation over a phrase list
fn compile_alternation(phrases: &[String]) -> Result<Option<Regex>, HumanizeError> {
    let mut sorted: Vec<&str> = phrases.iter().map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
    if sorted.is_empty() {
        return Ok(None);
    }
    sorted.sort_by(|a, b| b.len().cmp(&a.len()));
    let body = sorted
        .iter()
        .map(|p| bounded(p, &phrase_source(p)))
        .collect::<Vec<_>>()
        .join("|");
    Ok(Some(Regex::new(&format!("(?i)(?:{})", body))?))
}

fn keyed_lists<K, F>(map: PhraseMap, parse: F, table: &str) -> Result<HashMap<K, Vec<String>>, HumanizeError>
where
    K: std::hash::Hash + Eq,
    F: Fn(&str) -> Result<K, HumanizeError>,
{
    let mut out = HashMap::new();
    for (key, values) in map {
        let parsed = parse(&key)
            .map_err(|e| HumanizeError::Lexicon(format!("{}: {}", table, e)))?;
        out.insert(parsed, values);
    }
    Ok(out)
}

fn reverse_map(map: &PhraseMap) -> PhraseMap {
    let mut out: PhraseMap = BTreeMap::new();
    for (phrase, alternatives) in map {
        for alt in alternatives {
            out.entry(alt.clone()).or_default().push(phrase.clone());
        }
    }
    out
}

impl Lexicon {
    /// The lexicon bundled with the crate. Parsed on first use.
    pub fn builtin() -> Arc<Lexicon> {
        BUILTIN
            .get_or_init(|| {
                let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/lexicon.json"));
                let lexicon = Lexicon::from_json(raw).expect("data/lexicon.json parse failed");
                Arc::new(lexicon)
            })
            .clone()
    }

    /// Parse and compile a lexicon. Tables missing from the document are empty.
    pub fn from_json(raw: &str) -> Result<Lexicon, HumanizeError> {
        let file: LexiconFile = serde_json::from_str(raw)?;

        let mut family_patterns = HashMap::new();
        for (family, phrases) in [
            (SignalFamily::FormulaicTransitions, &file.transitions),
            (SignalFamily::Hedging, &file.hedges),
            (SignalFamily::AiVocabulary, &file.ai_vocabulary),
        ] {
            if let Some(re) = compile_alternation(phrases)? {
                family_patterns.insert(family, vec![re]);
            }
        }
        let statistical = file
            .statistical_templates
            .iter()
            .map(|src| Regex::new(&format!("(?i){}", src)))
            .collect::<Result<Vec<_>, _>>()?;
        family_patterns.insert(SignalFamily::StatisticalTemplates, statistical);

        let synonyms = compile_rules(&file.synonyms)?;
        let synonym_index = synonyms
            .iter()
            .enumerate()
            .map(|(i, rule)| (rule.phrase.clone(), i))
            .collect();

        let mut discourse_markers = Vec::with_capacity(file.discourse_markers.len());
        for group in &file.discourse_markers {
            let Some(alternation) = compile_alternation(&group.triggers)? else {
                continue;
            };
            let opener = Regex::new(&format!(r"^{}\s*,?\s*", alternation.as_str()))?;
            discourse_markers.push(DiscourseGroup {
                name: group.name.clone(),
                opener,
                replacements: group.replacements.clone(),
            });
        }

        let variant_map: PhraseMap = file
            .spelling_variants
            .iter()
            .flat_map(|(a, b)| [(a.clone(), vec![b.clone()]), (b.clone(), vec![a.clone()])])
            .collect();

        let lexicon = Lexicon {
            version: file.version,
            rhythm_pattern: file.rhythm_pattern,
            paraphrases: compile_rules(&file.paraphrases)?,
            synonyms,
            synonym_index,
            formal_to_informal: compile_rules(&file.formal_to_informal)?,
            informal_to_formal: compile_rules(&file.informal_to_formal)?,
            expansions: compile_rules(&reverse_map(&file.contractions))?,
            contractions: compile_rules(&file.contractions)?,
            technical_register: compile_rules(&file.technical_register)?,
            colloquial_register: compile_rules(&file.colloquial_register)?,
            syntactic_jitter: compile_rules(&file.syntactic_jitter)?,
            typos: compile_rules(&file.typos)?,
            grammar_slips: compile_rules(&file.grammar_slips)?,
            uk_spellings: compile_rules(&file.uk_spellings)?,
            concise_phrases: compile_rules(&file.concise_phrases)?,
            spelling_variants: compile_rules(&variant_map)?,
            fillers: keyed_lists(file.fillers, |k| k.parse::<Style>(), "fillers")?,
            emotion_markers: keyed_lists(file.emotion_markers, |k| k.parse::<Emotion>(), "emotionMarkers")?,
            transitions: file.transitions,
            hedges: file.hedges,
            ai_vocabulary: file.ai_vocabulary,
            ai_cliches: file.ai_cliches,
            family_patterns,
            stylistic_adverbs: file.stylistic_adverbs,
            rhetorical_questions: file.rhetorical_questions,
            parentheticals: file.parentheticals,
            subordinate_clauses: file.subordinate_clauses,
            elaborations: file.elaborations,
            discourse_markers,
            personal_voice: file.personal_voice,
            adversarial_asides: file.adversarial_asides,
        };

        debug!(
            version = %lexicon.version,
            transitions = lexicon.transitions.len(),
            synonyms = lexicon.synonyms.len(),
            "lexicon.compiled"
        );
        Ok(lexicon)
    }

    /// Compiled patterns for a lexical signal family. Passive voice and
    /// uniformity are structural and have no lexicon patterns.
    pub fn family_patterns(&self, family: SignalFamily) -> &[Regex] {
        self.family_patterns
            .get(&family)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn fillers(&self, style: Style) -> &[String] {
        self.fillers.get(&style).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn emotion_markers(&self, emotion: Emotion) -> &[String] {
        self.emotion_markers
            .get(&emotion)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Synonym rule for a single lowercase word
    pub fn synonym_rule(&self, word: &str) -> Option<&PhraseRule> {
        self.synonym_index
            .get(&word.to_lowercase())
            .and_then(|&i| self.synonyms.get(i))
    }
}
