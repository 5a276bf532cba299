// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/config.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines the engine configuration, its settings.json persistence and
// the command-line arguments that override it.
//
// Tree Location:
// - src/core/config.rs (EngineConfig, PerformanceMode, Args)
// - Depends on: clap, serde, serde_json, tokio, url

use crate::core::difficulty::MAX_DIFFICULTY;
use crate::core::error::EngineError;
use clap::Parser;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

const LOG_TARGET: &str = "luna::miner::config";

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Mining interval must not be negative (got {0})")]
    NegativeInterval(i64),

    #[error("Thread count must be at least 1")]
    ZeroThreads,

    #[error("Thread count cannot exceed 1024 (got {0})")]
    TooManyThreads(usize),

    #[error("Batch size must be at least 1")]
    ZeroBatchSize,

    #[error("Difficulty hint {0} exceeds the maximum of {MAX_DIFFICULTY}")]
    DifficultyTooHigh(u32),

    #[error("Network timeout must be greater than 0 seconds")]
    ZeroTimeout,

    #[error("Retry ceiling must be at least 1 attempt")]
    ZeroAttempts,

    #[error("Node URL {url:?} is invalid: {message}")]
    InvalidNodeUrl { url: String, message: String },

    #[error("Unknown performance mode {0:?} (expected power_saver, balanced or high_performance)")]
    UnknownPerformanceMode(String),

    #[error("IO operation failed on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize settings")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::ConfigInvalid {
            message: err.to_string(),
        }
    }
}

/// Throttle applied between search batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMode {
    PowerSaver,
    #[default]
    Balanced,
    HighPerformance,
}

impl PerformanceMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PerformanceMode::PowerSaver => "power_saver",
            PerformanceMode::Balanced => "balanced",
            PerformanceMode::HighPerformance => "high_performance",
        }
    }

    /// Pause inserted after each batch; `None` means yield only
    pub fn batch_pause(&self) -> Option<Duration> {
        match self {
            PerformanceMode::PowerSaver => Some(Duration::from_millis(8)),
            PerformanceMode::Balanced => Some(Duration::from_millis(1)),
            PerformanceMode::HighPerformance => None,
        }
    }
}

impl FromStr for PerformanceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "power_saver" => Ok(PerformanceMode::PowerSaver),
            "balanced" => Ok(PerformanceMode::Balanced),
            "high_performance" => Ok(PerformanceMode::HighPerformance),
            other => Err(ConfigError::UnknownPerformanceMode(other.to_string())),
        }
    }
}

impl fmt::Display for PerformanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine configuration, read-only for the duration of a mining cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub miner_address: String,
    pub auto_mining: bool,
    /// Minimum difficulty to mine at; the node's difficulty wins when higher
    pub difficulty_hint: u32,
    pub interval_seconds: i64,
    pub gpu_enabled: bool,
    pub threads: usize,
    /// Nonces per GPU dispatch
    pub batch_size: u32,
    pub performance_mode: PerformanceMode,
    pub node_url: String,
    pub network_timeout_secs: u64,
    /// Capacity of the submission seen-set
    pub cache_size: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub sync_interval_secs: u64,
    pub stats_persist_interval_secs: u64,
    /// Nonces tried per cycle before giving up; 0 searches until found or cancelled
    pub search_nonce_limit: u64,
    pub data_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            miner_address: "LUN_Node_Miner_Default".to_string(),
            auto_mining: false,
            difficulty_hint: 2,
            interval_seconds: 30,
            gpu_enabled: false,
            threads: num_cpus::get().max(1),
            batch_size: 100_000,
            performance_mode: PerformanceMode::Balanced,
            node_url: "https://bank.linglin.art".to_string(),
            network_timeout_secs: 30,
            cache_size: 1024,
            max_attempts: 3,
            backoff_base_ms: 500,
            sync_interval_secs: 10,
            stats_persist_interval_secs: 60,
            search_nonce_limit: 0,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl EngineConfig {
    /// Reject settings that must keep the scheduler out of `Searching`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_seconds < 0 {
            return Err(ConfigError::NegativeInterval(self.interval_seconds));
        }
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.threads > 1024 {
            return Err(ConfigError::TooManyThreads(self.threads));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.difficulty_hint > MAX_DIFFICULTY {
            return Err(ConfigError::DifficultyTooHigh(self.difficulty_hint));
        }
        if self.network_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        let url = url::Url::parse(&self.node_url).map_err(|e| ConfigError::InvalidNodeUrl {
            url: self.node_url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidNodeUrl {
                url: self.node_url.clone(),
                message: "expected an http(s) URL with a host".to_string(),
            });
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(0) as u64)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE_NAME)
    }

    /// Load settings from a file, falling back to defaults when it is missing
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(target: LOG_TARGET, "No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).await.map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: EngineConfig = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(target: LOG_TARGET, "Loaded settings from {:?}", path);
        Ok(config)
    }

    /// Save settings with a temp-file + rename so readers never see half a file
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let contents = serde_json::to_vec_pretty(self)?;
        let temp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path).await.map_err(io_err)?;
            file.write_all(&contents).await.map_err(io_err)?;
            file.flush().await.map_err(io_err)?;
        }
        fs::rename(&temp_path, path).await.map_err(io_err)?;
        debug!(target: LOG_TARGET, "Saved settings to {:?}", path);
        Ok(())
    }
}

/// Command-line arguments for the Luna miner
#[derive(Parser, Debug, Default)]
#[command(
    name = "luna-miner",
    version,
    about = "Mining & synchronization engine for Luna nodes",
    long_about = "Luna Miner searches proof-of-work for a Luna node, submits found blocks and keeps\n\
                  resumable mining history and statistics in the data directory.\n\n\
                  Settings are read from <data-dir>/settings.json; flags override individual fields.\n\n\
                  Examples:\n\
                    Auto-mine:     luna-miner --auto --threads 4 --performance-mode balanced\n\
                    Single block:  luna-miner --single --node-url https://bank.linglin.art\n\
                    Sync only:     luna-miner --sync"
)]
pub struct Args {
    /// Directory holding settings.json, history, stats and logs
    #[arg(long, value_name = "DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Node endpoint (http:// or https://)
    #[arg(short = 'o', long, value_name = "URL")]
    pub node_url: Option<String>,

    /// Address credited with mining rewards
    #[arg(short = 'u', long = "wallet", value_name = "ADDRESS")]
    pub wallet: Option<String>,

    /// Number of CPU search threads
    #[arg(short, long, value_name = "COUNT")]
    pub threads: Option<usize>,

    /// Enable the GPU batch search path (requires the "gpu" feature)
    #[arg(short, long)]
    pub gpu: bool,

    /// Nonces per GPU dispatch
    #[arg(long, value_name = "NONCES")]
    pub batch_size: Option<u32>,

    /// Seconds between auto-mining cycles
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub interval: Option<i64>,

    /// power_saver, balanced or high_performance
    #[arg(long, value_name = "MODE")]
    pub performance_mode: Option<String>,

    /// Minimum difficulty (leading zero hex digits)
    #[arg(long, value_name = "DIFFICULTY")]
    pub difficulty: Option<u32>,

    /// Network timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Mine continuously until interrupted
    #[arg(long, conflicts_with_all = ["single", "sync"])]
    pub auto: bool,

    /// Mine exactly one block and exit
    #[arg(long, conflicts_with = "sync")]
    pub single: bool,

    /// Sync with the node, print status and exit
    #[arg(long)]
    pub sync: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    pub log_level: String,
}

impl Args {
    /// Apply command-line overrides on top of loaded settings
    pub fn apply_to(&self, config: &mut EngineConfig) -> Result<(), ConfigError> {
        config.data_dir = self.data_dir.clone();
        if let Some(url) = &self.node_url {
            config.node_url = url.clone();
        }
        if let Some(wallet) = &self.wallet {
            config.miner_address = wallet.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.gpu {
            config.gpu_enabled = true;
        }
        if let Some(batch) = self.batch_size {
            config.batch_size = batch;
        }
        if let Some(interval) = self.interval {
            config.interval_seconds = interval;
        }
        if let Some(mode) = &self.performance_mode {
            config.performance_mode = mode.parse()?;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty_hint = difficulty;
        }
        if let Some(timeout) = self.timeout {
            config.network_timeout_secs = timeout;
        }
        if self.auto {
            config.auto_mining = true;
        }
        if config.gpu_enabled && !cfg!(feature = "gpu") {
            warn!(target: LOG_TARGET, "GPU requested but this build has no \"gpu\" feature; CPU only");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_performance_mode_names_round_trip() {
        for mode in [
            PerformanceMode::PowerSaver,
            PerformanceMode::Balanced,
            PerformanceMode::HighPerformance,
        ] {
            assert_eq!(mode.as_str().parse::<PerformanceMode>().unwrap(), mode);
            assert_eq!(serde_json::to_string(&mode).unwrap(), format!("\"{}\"", mode.as_str()));
        }
        assert!("turbo".parse::<PerformanceMode>().is_err());
    }

    #[test]
    fn test_power_saver_pauses_longest() {
        let saver = PerformanceMode::PowerSaver.batch_pause().unwrap();
        let balanced = PerformanceMode::Balanced.batch_pause().unwrap();
        assert!(saver > balanced);
        assert!(PerformanceMode::HighPerformance.batch_pause().is_none());
    }

    #[test]
    fn test_validate_rejects_negative_interval_and_zero_threads() {
        let mut config = EngineConfig::default();
        assert!(config.validate().is_ok());

        config.interval_seconds = -1;
        assert!(matches!(config.validate(), Err(ConfigError::NegativeInterval(-1))));

        config.interval_seconds = 30;
        config.threads = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroThreads)));

        let engine_err: EngineError = config.validate().unwrap_err().into();
        assert!(matches!(engine_err, EngineError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = EngineConfig {
            node_url: "ftp://node".to_string(),
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidNodeUrl { .. })));
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"threads": 4, "performance_mode": "power_saver"}"#).unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.performance_mode, PerformanceMode::PowerSaver);
        assert_eq!(config.interval_seconds, 30);
    }

    #[test]
    fn test_args_override_loaded_settings() {
        let args = Args::parse_from([
            "luna-miner",
            "--threads",
            "6",
            "--performance-mode",
            "high_performance",
            "--interval",
            "5",
        ]);
        let mut config = EngineConfig::default();
        args.apply_to(&mut config).unwrap();
        assert_eq!(config.threads, 6);
        assert_eq!(config.interval_seconds, 5);
        assert_eq!(config.performance_mode, PerformanceMode::HighPerformance);
    }

    #[tokio::test]
    async fn test_settings_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        assert_eq!(EngineConfig::load(&path).await.unwrap(), EngineConfig::default());

        let config = EngineConfig {
            threads: 3,
            auto_mining: true,
            ..EngineConfig::default()
        };
        config.save(&path).await.unwrap();
        assert_eq!(EngineConfig::load(&path).await.unwrap(), config);
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Initial engine configuration.
//   - EngineConfig with serde defaults, validate() and settings.json persistence.
//   - Args (moved from core/types.rs) now overrides loaded settings instead of
//     carrying pool options.
