use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::merge::heuristics::MergeThresholds;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub merge: MergeThresholds,

    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_video_extensions")]
    pub extensions: Vec<String>,

    /// Files smaller than this are assumed to be samples or junk.
    #[serde(default = "default_min_file_size")]
    pub min_file_size: u64,

    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Run ffprobe against each discovered file.
    #[serde(default = "default_probe_metadata")]
    pub probe_metadata: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Merge events older than this are eligible for pruning.
    #[serde(default = "default_history_max_age_days")]
    pub max_age_days: u32,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidmerge")
        .join("vidmerge.db")
}

fn default_video_extensions() -> Vec<String> {
    crate::scanner::discovery::default_extensions()
}

fn default_min_file_size() -> u64 {
    10 * 1024
}

fn default_recursive() -> bool {
    true
}

fn default_probe_metadata() -> bool {
    true
}

fn default_history_max_age_days() -> u32 {
    365
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: default_video_extensions(),
            min_file_size: default_min_file_size(),
            recursive: default_recursive(),
            probe_metadata: default_probe_metadata(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_history_max_age_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            scanner: ScannerConfig::default(),
            merge: MergeThresholds::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidmerge")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidmerge")
            .join("config.toml")
    }
}
