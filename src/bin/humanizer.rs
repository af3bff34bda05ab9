use anyhow::{anyhow, Context};
use humanizer_lib::models::{Complexity, Configuration, Emotion, ErrorLevel, Formality, Style};
use humanizer_lib::services::{ConfigStore, Lexicon, Orchestrator, SeededRandom, SystemRandom};
use humanizer_lib::services::RandomSource;
use humanizer_lib::{analyze_text, init_logging};
use serde::Serialize;
use std::io::Read;
use tracing::info;

const USAGE: &str = "Usage:\n  humanizer [<path>] [--style <s>] [--complexity <c>] [--emotion <e>] [--formality <f>] [--context <ctx>] [--errors <level>] [--retries <n>] [--seed <n>] [--no-facts] [--analyze] [--save-defaults] [--out <json_path>]\n\nNotes:\n  - Reads stdin when no path is given.\n  - Defaults come from the saved config file; flags override them.\n  - `--analyze` only scores the text, without rewriting it.\n  - `--save-defaults` writes the overridden settings to the config file and exits.";

const VALUE_FLAGS: &[&str] = &[
    "--style", "--complexity", "--emotion", "--formality", "--context", "--errors", "--retries", "--seed", "--out",
];

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

/// First argument that is neither a flag nor a flag's value
fn positional_path(args: &[String]) -> Option<String> {
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        return Some(arg.clone());
    }
    None
}

fn apply_overrides(mut config: Configuration, args: &[String]) -> anyhow::Result<Configuration> {
    if let Some(v) = parse_arg_value(args, "--style") {
        config.style = v.parse::<Style>()?;
    }
    if let Some(v) = parse_arg_value(args, "--complexity") {
        config.complexity = v.parse::<Complexity>()?;
    }
    if let Some(v) = parse_arg_value(args, "--emotion") {
        config.emotion = v.parse::<Emotion>()?;
    }
    if let Some(v) = parse_arg_value(args, "--formality") {
        config.formality = v.parse::<Formality>()?;
    }
    if let Some(v) = parse_arg_value(args, "--context") {
        config.cultural_context = v;
    }
    if let Some(v) = parse_arg_value(args, "--errors") {
        config.error_level = v.parse::<ErrorLevel>()?;
    }
    if let Some(v) = parse_arg_value(args, "--retries") {
        config.max_retries = v
            .parse()
            .with_context(|| format!("--retries expects a positive integer, got '{}'", v))?;
    }
    if has_flag(args, "--no-facts") {
        config.preserve_facts = false;
    }
    config.validate()?;
    Ok(config)
}

/// Persist the saved defaults with `args` applied on top
fn save_defaults(store: &ConfigStore, args: &[String]) -> anyhow::Result<Configuration> {
    let current = store.load().map_err(|e| anyhow!(e))?;
    let config = apply_overrides(current.defaults, args)?;
    store.save_defaults(&config).map_err(|e| anyhow!(e))?;
    Ok(config)
}

fn read_input(path: Option<&str>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("read file failed: {}", path)),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("read stdin failed")?;
            Ok(text)
        }
    }
}

fn emit<T: Serialize>(value: &T, out_path: Option<&str>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out_path {
        Some(out_path) => {
            std::fs::write(out_path, json).with_context(|| format!("write out failed: {}", out_path))?;
            eprintln!("Wrote JSON: {}", out_path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    init_logging();

    let store = ConfigStore::default_config_dir()
        .map(ConfigStore::new)
        .ok_or_else(|| anyhow!("no config directory available on this platform"))?;

    if has_flag(&args, "--save-defaults") {
        let config = save_defaults(&store, &args)?;
        info!(path = %store.config_file().display(), style = %config.style, "[CLI] defaults saved");
        eprintln!("Saved defaults: {}", store.config_file().display());
        return Ok(());
    }

    let path = positional_path(&args);
    let out_path = parse_arg_value(&args, "--out");
    let text = read_input(path.as_deref())?;

    if has_flag(&args, "--analyze") {
        let analysis = analyze_text(&text);
        info!(score = analysis.overall_score, risk = %analysis.risk_level, "[CLI] analysis finished");
        return emit(&analysis, out_path.as_deref());
    }

    let app_config = store.load().map_err(|e| anyhow!(e))?;
    let config = apply_overrides(app_config.defaults.clone(), &args)?;

    let lexicon = Lexicon::builtin();
    let scorer = app_config.scorer.build_scorer(lexicon.clone())?;
    let orchestrator = Orchestrator::with_scorer(lexicon, scorer);

    let mut rng: Box<dyn RandomSource> = match parse_arg_value(&args, "--seed") {
        Some(seed) => {
            let seed: u64 = seed
                .parse()
                .with_context(|| format!("--seed expects an unsigned integer, got '{}'", seed))?;
            Box::new(SeededRandom::new(seed))
        }
        None => Box::new(SystemRandom::new()),
    };

    info!(
        path = path.as_deref().unwrap_or("(stdin)"),
        chars = text.chars().count(),
        style = %config.style,
        "[CLI] humanize started"
    );
    let result = orchestrator.humanize(&text, &config, rng.as_mut()).await?;
    emit(&result, out_path.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        std::iter::once("humanizer").chain(items.iter().copied()).map(String::from).collect()
    }

    #[test]
    fn test_positional_path_skips_flag_values() {
        assert_eq!(positional_path(&args(&["--style", "casual", "in.txt"])), Some("in.txt".to_string()));
        assert_eq!(positional_path(&args(&["--analyze", "doc.md", "--out", "o.json"])), Some("doc.md".to_string()));
        assert_eq!(positional_path(&args(&["--seed", "4"])), None);
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let config = apply_overrides(
            Configuration::default(),
            &args(&["--style", "academic", "--errors", "none", "--retries", "2", "--no-facts", "--context", "uk"]),
        )
        .unwrap();
        assert_eq!(config.style, Style::Academic);
        assert_eq!(config.error_level, ErrorLevel::None);
        assert_eq!(config.max_retries, 2);
        assert!(!config.preserve_facts);
        assert_eq!(config.cultural_context, "uk");
    }

    #[test]
    fn test_save_defaults_merges_flags_into_config_file() {
        let dir = std::env::temp_dir().join(format!("humanizer_cli_{}", uuid::Uuid::new_v4()));
        let store = ConfigStore::new(dir.clone());

        save_defaults(&store, &args(&["--style", "academic", "--save-defaults"])).unwrap();
        let saved = save_defaults(&store, &args(&["--retries", "4", "--save-defaults"])).unwrap();
        assert_eq!(saved.style, Style::Academic);
        assert_eq!(saved.max_retries, 4);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.defaults, saved);
        assert!(save_defaults(&store, &args(&["--retries", "0"])).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_bad_overrides_fail() {
        assert!(apply_overrides(Configuration::default(), &args(&["--style", "poetic"])).is_err());
        assert!(apply_overrides(Configuration::default(), &args(&["--retries", "0"])).is_err());
        assert!(apply_overrides(Configuration::default(), &args(&["--retries", "many"])).is_err());
    }
}
