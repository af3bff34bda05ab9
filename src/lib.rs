pub mod models;
pub mod services;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use models::{Configuration, DetectionAnalysis, PipelineResult};
use services::{DetectionScorer, HumanizeError, Lexicon, Orchestrator, SeededRandom, SystemRandom};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_PREFIX: &str = "humanizer_";
const LOGS_KEPT: usize = 30;

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

/// Rewrite `text` with an entropy-seeded random source
pub async fn humanize(text: &str, config: &Configuration) -> Result<PipelineResult, HumanizeError> {
    let mut rng = SystemRandom::new();
    Orchestrator::new(Lexicon::builtin())
        .humanize(text, config, &mut rng)
        .await
}

/// Rewrite `text` reproducibly: the same seed gives the same output text
pub async fn humanize_seeded(
    text: &str,
    config: &Configuration,
    seed: u64,
) -> Result<PipelineResult, HumanizeError> {
    let mut rng = SeededRandom::new(seed);
    Orchestrator::new(Lexicon::builtin())
        .humanize(text, config, &mut rng)
        .await
}

/// Score `text` with the builtin lexicon and documented weights
pub fn analyze_text(text: &str) -> DetectionAnalysis {
    DetectionScorer::new(Lexicon::builtin()).analyze(text)
}

/// Initialize logging system with timestamped log files.
///
/// The library never calls this itself; binaries do, once, at startup.
pub fn init_logging() {
    let disable_file_log = env_flag("HUMANIZER_DISABLE_FILE_LOG");
    let disable_cleanup = env_flag("HUMANIZER_DISABLE_LOG_CLEANUP");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if disable_file_log {
        init_console_only_logging(env_filter);
        info!("File logging disabled via HUMANIZER_DISABLE_FILE_LOG");
        return;
    }

    let logs_dir = match std::env::var("HUMANIZER_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => get_logs_dir(),
    };

    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        init_console_only_logging(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("{}{}.log", LOG_PREFIX, timestamp);

    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    // stdout carries JSON results, so the console layer writes to stderr
    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true);

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer)
            .try_init();
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .try_init();
    }

    info!("=== Humanizer Started ===");
    info!("Log file: {}/{}", logs_dir.display(), log_filename);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if !disable_cleanup {
        std::thread::spawn(move || {
            cleanup_old_logs(&logs_dir, LOGS_KEPT);
        });
    }
}

/// Get the logs directory path
fn get_logs_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("humanizer").join("logs");
    }
    PathBuf::from("logs")
}

fn cleanup_old_logs(logs_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with(LOG_PREFIX) && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len().saturating_sub(keep);
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

fn init_console_only_logging(env_filter: EnvFilter) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{RiskLevel, Style};

    const SCENARIO: &str =
        "In conclusion, the implementation of advanced methodologies demonstrates significant improvements.";

    #[test]
    fn test_analyze_text_entry_point() {
        let first = analyze_text(SCENARIO);
        assert!(first.risk_level >= RiskLevel::High);
        assert_eq!(analyze_text(SCENARIO), first);
    }

    #[tokio::test]
    async fn test_humanize_rejects_empty_text() {
        let err = humanize("   ", &Configuration::default()).await.unwrap_err();
        assert!(matches!(err, HumanizeError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_seeded_runs_repeat() {
        let config = Configuration::default().with_style(Style::Casual);
        let a = humanize_seeded(SCENARIO, &config, 11).await.unwrap();
        let b = humanize_seeded(SCENARIO, &config, 11).await.unwrap();
        assert_eq!(a.humanized_text, b.humanized_text);
        assert_eq!(a.attempts, b.attempts);
        assert_ne!(a.metadata.request_id, b.metadata.request_id);
    }

    #[test]
    fn test_cleanup_keeps_newest_logs() {
        let dir = std::env::temp_dir().join(format!("humanizer_logs_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        for i in 0..5 {
            fs::write(dir.join(format!("{}{}.log", LOG_PREFIX, i)), "x").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        fs::write(dir.join("other.log"), "x").unwrap();

        cleanup_old_logs(&dir, 2);
        let remaining: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(remaining.len(), 3);
        assert!(remaining.contains(&"other.log".to_string()));
        let _ = fs::remove_dir_all(&dir);
    }
}
