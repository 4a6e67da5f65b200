//! Configuration loading, validation, and management for PromptMaster.
//!
//! Loads configuration from `~/.promptmaster/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use promptmaster_core::TargetModel;
use promptmaster_core::state::MAX_IMAGE_BYTES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.promptmaster/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the remote model. The persisted credential slot is used
    /// when this is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the remote model API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Remote model used for both synthesis and ingestion
    #[serde(default = "default_remote_model")]
    pub remote_model: String,

    /// Sampling temperature for synthesis
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Sampling temperature for document ingestion
    #[serde(default = "default_ingest_temperature")]
    pub ingest_temperature: f32,

    /// Max output tokens per remote response
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Target model selected when none is given on the command line
    #[serde(default = "default_target")]
    pub default_target: String,

    /// Disable the remote service's harm-category blocking thresholds
    #[serde(default = "default_true")]
    pub relax_safety: bool,

    /// HTTP timeout in seconds; 0 means the engine imposes none
    #[serde(default)]
    pub request_timeout_secs: u64,

    /// Largest accepted reference image, in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Where the knowledge base, its history and the credential are stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_remote_model() -> String {
    "gemini-2.5-flash-preview-09-2025".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_ingest_temperature() -> f32 {
    0.2
}
fn default_max_output_tokens() -> u32 {
    2000
}
fn default_target() -> String {
    "flux".into()
}
fn default_true() -> bool {
    true
}
fn default_max_image_bytes() -> usize {
    MAX_IMAGE_BYTES
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("remote_model", &self.remote_model)
            .field("temperature", &self.temperature)
            .field("ingest_temperature", &self.ingest_temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("default_target", &self.default_target)
            .field("relax_safety", &self.relax_safety)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.promptmaster/config.toml).
    ///
    /// Also checks environment variables:
    /// - `PROMPTMASTER_API_KEY` (highest priority), then `GEMINI_API_KEY`
    /// - `PROMPTMASTER_MODEL` overrides the remote model
    /// - `PROMPTMASTER_DATA_DIR` overrides the data directory
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(key) = env("PROMPTMASTER_API_KEY").or_else(|| env("GEMINI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = env("PROMPTMASTER_MODEL") {
            self.remote_model = model;
        }
        if let Some(dir) = env("PROMPTMASTER_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".promptmaster")
    }

    /// Directory holding the persisted slots.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(Self::config_dir)
    }

    /// The configured default target model.
    pub fn default_target_model(&self) -> Result<TargetModel, ConfigError> {
        TargetModel::from_id(&self.default_target)
            .map_err(|e| ConfigError::ValidationError(e.message().to_string()))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("temperature", self.temperature),
            ("ingest_temperature", self.ingest_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_output_tokens must be > 0".into(),
            ));
        }

        if self.max_image_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_image_bytes must be > 0".into(),
            ));
        }

        self.default_target_model()?;
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            remote_model: default_remote_model(),
            temperature: default_temperature(),
            ingest_temperature: default_ingest_temperature(),
            max_output_tokens: default_max_output_tokens(),
            default_target: default_target(),
            relax_safety: true,
            request_timeout_secs: 0,
            max_image_bytes: default_max_image_bytes(),
            data_dir: None,
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
