// Configuration Storage Service
// Persisted default settings for the CLI, with timestamped backups

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{Configuration, SignalFamily};
use crate::services::detection::{default_family_weights, DetectionScorer};
use crate::services::error::HumanizeError;
use crate::services::lexicon::Lexicon;

const BACKUPS_KEPT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub defaults: Configuration,
    #[serde(default)]
    pub scorer: ScorerSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            defaults: Configuration::default(),
            scorer: ScorerSettings::default(),
        }
    }
}

/// Detector tuning a deployment may override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorerSettings {
    #[serde(default = "default_family_weights")]
    pub family_weights: BTreeMap<SignalFamily, f64>,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            family_weights: default_family_weights(),
        }
    }
}

impl ScorerSettings {
    /// Build a scorer with these weights (validated and renormalised)
    pub fn build_scorer(&self, lexicon: Arc<Lexicon>) -> Result<DetectionScorer, HumanizeError> {
        DetectionScorer::with_weights(lexicon, &self.family_weights)
    }
}

fn default_version() -> String { env!("CARGO_PKG_VERSION").to_string() }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("humanizer"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file; a missing file yields the defaults
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            debug!(path = %self.config_file.display(), "[CONFIG] no config file, using defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config
            .defaults
            .validate()
            .map_err(|e| format!("Invalid defaults in config: {}", e))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Replace only the pipeline defaults, keeping scorer settings
    pub fn save_defaults(&self, defaults: &Configuration) -> Result<(), String> {
        defaults.validate().map_err(|e| e.to_string())?;
        let mut config = self.load()?;
        config.defaults = defaults.clone();
        self.save(&config)
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        self.cleanup_old_backups(&backup_dir, BACKUPS_KEPT)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Timestamped names sort oldest first
        entries.sort_by_key(|e| e.file_name());

        for entry in entries.iter().take(entries.len() - keep) {
            if let Err(e) = fs::remove_file(entry.path()) {
                warn!(path = %entry.path().display(), error = %e, "[CONFIG] failed to remove old backup");
            }
        }

        Ok(())
    }
}
