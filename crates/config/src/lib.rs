//! Configuration loading, validation, and management for localcoder.
//!
//! Loads configuration from `<project>/.coder/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory (relative to the project root) holding localcoder state.
pub const STATE_DIR: &str = ".coder";

/// The root configuration structure.
///
/// Maps directly to `<project>/.coder/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend model tag
    #[serde(default = "default_model")]
    pub model: String,

    /// Ollama base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Context window requested from the backend
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,

    /// Overall deadline for one streamed response
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Tool rounds per user turn before the agent stops
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_model() -> String {
    "qwen3:8b".into()
}
fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_num_ctx() -> u32 {
    8192
}
fn default_request_timeout_secs() -> u64 {
    300
}
fn default_max_rounds() -> usize {
    15
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// State directory, relative to the project root
    #[serde(default = "default_memory_dir")]
    pub dir: String,

    #[serde(default = "default_memory_file")]
    pub file: String,

    /// Records injected into each round's system message
    #[serde(default = "default_limit")]
    pub context_limit: usize,

    /// Results returned by `recall` and `/memory search`
    #[serde(default = "default_limit")]
    pub search_limit: usize,
}

fn default_memory_dir() -> String {
    STATE_DIR.into()
}
fn default_memory_file() -> String {
    "memories.jsonl".into()
}
fn default_limit() -> usize {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dir: default_memory_dir(),
            file: default_memory_file(),
            context_limit: default_limit(),
            search_limit: default_limit(),
        }
    }
}

impl MemoryConfig {
    /// Location of the memory file for a project.
    pub fn path_for(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.dir).join(&self.file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Tools that need operator confirmation before running
    #[serde(default = "default_approval_required")]
    pub approval_required: Vec<String>,

    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// `run_command` output longer than this is cut down
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
}

fn default_approval_required() -> Vec<String> {
    vec!["run_command".into(), "write_file".into(), "edit_file".into()]
}
fn default_command_timeout_secs() -> u64 {
    60
}
fn default_max_output_chars() -> usize {
    10_000
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            approval_required: default_approval_required(),
            command_timeout_secs: default_command_timeout_secs(),
            max_output_chars: default_max_output_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration for a project (`<root>/.coder/config.toml`).
    ///
    /// Environment variables override the file:
    /// - `LOCALCODER_MODEL`
    /// - `OLLAMA_HOST`
    pub fn load_for_project(project_root: &Path) -> Result<Self, ConfigError> {
        let config_path = Self::config_path(project_root);
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

    /// Get the configuration file path for a project.
    pub fn config_path(project_root: &Path) -> PathBuf {
        project_root.join(STATE_DIR).join("config.toml")
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("LOCALCODER_MODEL").filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
        if let Some(host) = lookup("OLLAMA_HOST").filter(|h| !h.trim().is_empty()) {
            self.base_url = normalize_host(&host);
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "max_rounds must be at least 1".into(),
            ));
        }
        if self.request_timeout_secs == 0 || self.tools.command_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be at least 1 second".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            num_ctx: default_num_ctx(),
            request_timeout_secs: default_request_timeout_secs(),
            max_rounds: default_max_rounds(),
            memory: MemoryConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// `OLLAMA_HOST` may be a bare `host:port`.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
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
