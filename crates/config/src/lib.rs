//! Configuration loading, validation, and management for SevaSaathi.
//!
//! Loads configuration from `~/.sevasaathi/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.sevasaathi/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the language-model backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-attempt deadline for model calls, in seconds
    #[serde(default = "default_api_timeout_seconds")]
    pub api_timeout_seconds: f64,

    /// Retries after the first failed attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Path to the scheme catalog JSON
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Backend selection
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Sampling parameters sent with every request
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Query matcher tuning
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Prompt size bounds
    #[serde(default)]
    pub context: ContextConfig,

    /// Backoff between retries
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_api_timeout_seconds() -> f64 {
    30.0
}
fn default_max_retries() -> u32 {
    2
}
fn default_data_path() -> String {
    "data/scheme_data.json".into()
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
            .field("api_timeout_seconds", &self.api_timeout_seconds)
            .field("max_retries", &self.max_retries)
            .field("data_path", &self.data_path)
            .field("provider", &self.provider)
            .field("generation", &self.generation)
            .field("retrieval", &self.retrieval)
            .field("context", &self.context)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Known backend kinds.
pub const PROVIDER_KINDS: &[&str] = &["gemini", "openai"];

/// Upper bound for `api_timeout_seconds` (one hour).
pub const MAX_API_TIMEOUT_SECONDS: f64 = 3600.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// "gemini" or "openai" (any OpenAI-compatible endpoint)
    #[serde(default = "default_provider_kind")]
    pub kind: String,

    /// Override the backend base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,
}

fn default_provider_kind() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-1.5-flash".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            api_url: None,
            model: default_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_temperature() -> f32 {
    0.3
}
fn default_top_p() -> f32 {
    0.8
}
fn default_top_k() -> u32 {
    20
}
fn default_max_output_tokens() -> u32 {
    1024
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum schemes passed to the prompt
    #[serde(default = "default_retrieval_top_k")]
    pub top_k: usize,

    /// Weight per query token found in a scheme name
    #[serde(default = "default_name_weight")]
    pub name_weight: f32,

    /// Weight per query token found in a scheme category
    #[serde(default = "default_category_weight")]
    pub category_weight: f32,

    /// Weight per query token found in description, eligibility or benefits
    #[serde(default = "default_body_weight")]
    pub body_weight: f32,
}

fn default_retrieval_top_k() -> usize {
    5
}
fn default_name_weight() -> f32 {
    3.0
}
fn default_category_weight() -> f32 {
    2.0
}
fn default_body_weight() -> f32 {
    1.0
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_retrieval_top_k(),
            name_weight: default_name_weight(),
            category_weight: default_category_weight(),
            body_weight: default_body_weight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Prior turns carried into each prompt
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    /// Upper bound on one rendered scheme, in characters
    #[serde(default = "default_max_record_chars")]
    pub max_record_chars: usize,
}

fn default_max_history_turns() -> usize {
    6
}
fn default_max_record_chars() -> usize {
    1200
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history_turns: default_max_history_turns(),
            max_record_chars: default_max_record_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_backoff_base_ms() -> u64 {
    500
}
fn default_backoff_max_ms() -> u64 {
    8000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.sevasaathi/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment variable overrides:
    /// - `SEVASAATHI_API_KEY` (highest priority), `GEMINI_API_KEY`, `OPENAI_API_KEY`
    /// - `SEVASAATHI_DATA_PATH`, `SEVASAATHI_API_TIMEOUT_SECONDS`, `SEVASAATHI_MAX_RETRIES`
    /// - `SEVASAATHI_PROVIDER`, `SEVASAATHI_MODEL`
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Read `path`, apply overrides from `lookup`, then validate once.
    fn load_with_env(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse `path` without validating. A missing file yields the defaults.
    fn read_file(path: &Path) -> Result<Self, ConfigError> {
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

        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(key) = lookup("SEVASAATHI_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            self.api_key = lookup("GEMINI_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(path) = lookup("SEVASAATHI_DATA_PATH") {
            self.data_path = path;
        }

        if let Some(raw) = lookup("SEVASAATHI_API_TIMEOUT_SECONDS") {
            self.api_timeout_seconds = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "SEVASAATHI_API_TIMEOUT_SECONDS must be a number, got '{raw}'"
                ))
            })?;
        }

        if let Some(raw) = lookup("SEVASAATHI_MAX_RETRIES") {
            self.max_retries = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "SEVASAATHI_MAX_RETRIES must be a non-negative integer, got '{raw}'"
                ))
            })?;
        }

        if let Some(kind) = lookup("SEVASAATHI_PROVIDER") {
            self.provider.kind = kind;
        }

        if let Some(model) = lookup("SEVASAATHI_MODEL") {
            self.provider.model = model;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sevasaathi")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeout = self.api_timeout_seconds;
        if !(timeout > 0.0 && timeout <= MAX_API_TIMEOUT_SECONDS) {
            return Err(ConfigError::ValidationError(format!(
                "api_timeout_seconds must be greater than 0 and at most {MAX_API_TIMEOUT_SECONDS}, got {timeout}"
            )));
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".into(),
            ));
        }

        let weights = [
            self.retrieval.name_weight,
            self.retrieval.category_weight,
            self.retrieval.body_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::ValidationError(
                "retrieval weights must be non-negative numbers".into(),
            ));
        }
        if weights.iter().sum::<f32>() <= 0.0 {
            return Err(ConfigError::ValidationError(
                "at least one retrieval weight must be > 0".into(),
            ));
        }

        if self.context.max_record_chars == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_record_chars must be at least 1".into(),
            ));
        }

        if self.retry.backoff_max_ms < self.retry.backoff_base_ms {
            return Err(ConfigError::ValidationError(
                "retry.backoff_max_ms must be >= retry.backoff_base_ms".into(),
            ));
        }

        if !PROVIDER_KINDS.contains(&self.provider.kind.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "provider.kind must be one of {:?}, got '{}'",
                PROVIDER_KINDS, self.provider.kind
            )));
        }

        Ok(())
    }

    /// The API key, or a `MissingSetting` error for commands that call the model.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingSetting("api_key".into())),
        }
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.require_api_key().is_ok()
    }

    /// Per-attempt deadline as a `Duration`.
    ///
    /// Falls back to the default for values `validate` would reject.
    pub fn api_timeout(&self) -> std::time::Duration {
        std::time::Duration::try_from_secs_f64(self.api_timeout_seconds)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| std::time::Duration::from_secs_f64(default_api_timeout_seconds()))
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_timeout_seconds: default_api_timeout_seconds(),
            max_retries: default_max_retries(),
            data_path: default_data_path(),
            provider: ProviderConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            retry: RetryConfig::default(),
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

    #[error("Required setting '{0}' is missing")]
    MissingSetting(String),
}
