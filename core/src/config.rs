//! Persisted proxy configuration.
//!
//! Stores configuration in JSON format at `~/.scanproxy/config.json`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Importance values strictly above this are background.
pub const DEFAULT_FOREGROUND_IMPORTANCE_THRESHOLD: i32 = 125;

/// Throttling policy constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Max admitted foreground requests per app inside the window.
    #[serde(default = "default_foreground_max_requests", rename = "foregroundMaxRequests")]
    pub foreground_max_requests: usize,

    /// Foreground sliding window length in milliseconds.
    #[serde(default = "default_foreground_window_ms", rename = "foregroundWindowMs")]
    pub foreground_window_ms: u64,

    /// Minimum spacing between any two background admissions.
    #[serde(default = "default_background_interval_ms", rename = "backgroundIntervalMs")]
    pub background_interval_ms: u64,

    /// Importance cut-off between foreground and background callers.
    #[serde(
        default = "default_foreground_importance_threshold",
        rename = "foregroundImportanceThreshold"
    )]
    pub foreground_importance_threshold: i32,

    /// Packages that are never throttled.
    #[serde(default, rename = "exceptionPackages")]
    pub exception_packages: Vec<String>,
}

fn default_foreground_max_requests() -> usize {
    4
}

fn default_foreground_window_ms() -> u64 {
    120_000
}

fn default_background_interval_ms() -> u64 {
    30 * 60 * 1000
}

fn default_foreground_importance_threshold() -> i32 {
    DEFAULT_FOREGROUND_IMPORTANCE_THRESHOLD
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            foreground_max_requests: default_foreground_max_requests(),
            foreground_window_ms: default_foreground_window_ms(),
            background_interval_ms: default_background_interval_ms(),
            foreground_importance_threshold: default_foreground_importance_threshold(),
            exception_packages: Vec::new(),
        }
    }
}

impl ThrottleConfig {
    pub fn with_exception_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exception_packages = packages.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_exception(&self, package: &str) -> bool {
        self.exception_packages.iter().any(|p| p == package)
    }
}

/// Configuration data stored in JSON format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Whether app scan requests are throttled at all.
    #[serde(default = "default_true", rename = "scanThrottleEnabled")]
    pub scan_throttle_enabled: bool,

    #[serde(default)]
    pub throttle: ThrottleConfig,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_throttle_enabled: true,
            throttle: ThrottleConfig::default(),
        }
    }
}

/// Configuration store.
///
/// Handles reading and writing configuration to `~/.scanproxy/config.json`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.scanproxy/config.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        let config_dir = home.join(".scanproxy");
        let config_path = config_dir.join("config.json");

        Ok(Self { config_path })
    }

    /// Create a config store with a custom path (for testing).
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Load configuration from disk.
    ///
    /// Returns default config if the file doesn't exist.
    pub async fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub async fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self.config_dir();
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .await
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        Ok(())
    }

    /// Get the persisted throttle-enabled flag.
    pub async fn get_scan_throttle_enabled(&self) -> Result<bool> {
        let config = self.load().await?;
        Ok(config.scan_throttle_enabled)
    }

    /// Persist the throttle-enabled flag.
    pub async fn set_scan_throttle_enabled(&self, enabled: bool) -> Result<()> {
        let mut config = self.load().await?;
        config.scan_throttle_enabled = enabled;
        self.save(&config).await
    }
}
