//! Configuration system for ferry.
//!
//! Resolution order: command-line flags → environment variables → config file → defaults.
//! Flags are applied by the binary on top of what [`FerryConfig::load`] returns.
//!
//! Config file location:
//!   1. $FERRY_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/ferry/config.toml
//!   3. ~/.config/ferry/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FerryConfig {
    pub server: ServerConfig,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// API base, e.g. `http://<host>:2283/api`.
    pub endpoint: String,
    pub api_key: String,
    /// Device identity the remote inventory is keyed by. Empty = hostname.
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Concurrent upload workers. 0 = available parallelism.
    pub workers: u32,
    /// Intake queue bound. 0 = 4 × workers.
    pub queue_capacity: u32,
    /// Consecutive server errors before the run is considered overloaded.
    pub max_server_errors: u32,
    /// Per-request timeout in seconds. 0 = none.
    pub request_timeout_secs: u64,
    /// Descend into sub-folders of each path.
    pub recursive: bool,
    /// Skip the confirmation prompt before uploading.
    pub assume_yes: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: 0,
            max_server_errors: 3,
            request_timeout_secs: 0,
            recursive: false,
            assume_yes: true,
        }
    }
}

impl UploadSettings {
    /// Worker count with the 0 = auto rule applied.
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.workers as usize
        }
    }

    /// Queue bound with the 0 = auto rule applied.
    pub fn effective_queue_capacity(&self) -> usize {
        if self.queue_capacity == 0 {
            self.effective_workers() * 4
        } else {
            self.queue_capacity as usize
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("ferry")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("{}", .0.join("; "))]
    Invalid(Vec<&'static str>),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl FerryConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::file_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Read one file, falling back to defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(FerryConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("FERRY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&FerryConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Check everything a run needs, reporting every problem at once.
    pub fn validate(&self, paths: &[PathBuf]) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        if self.server.endpoint.is_empty() {
            problems.push("must specify a server address");
        }
        if self.server.api_key.is_empty() {
            problems.push("must specify an API key");
        }
        if paths.is_empty() {
            problems.push("must specify at least one path");
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// Apply FERRY_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("FERRY_SERVER__ENDPOINT") {
            self.server.endpoint = v;
        }
        if let Some(v) = var("FERRY_SERVER__API_KEY") {
            self.server.api_key = v;
        }
        if let Some(v) = var("FERRY_SERVER__DEVICE_ID") {
            self.server.device_id = v;
        }
        if let Some(v) = var("FERRY_UPLOAD__WORKERS") {
            if let Ok(n) = v.parse() {
                self.upload.workers = n;
            }
        }
        if let Some(v) = var("FERRY_UPLOAD__RECURSIVE") {
            self.upload.recursive = v == "true" || v == "1";
        }
    }
}
