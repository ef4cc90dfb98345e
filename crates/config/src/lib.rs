//! Configuration loading, validation, and management for Third Voice.
//!
//! Loads configuration from `~/.thirdvoice/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thirdvoice_core::ProviderDescriptor;

/// The root configuration structure.
///
/// Maps directly to `~/.thirdvoice/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bearer token for the chat-completion endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Name of the endpoint (used in logs)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature for every analysis call
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Invocation loop settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Ordered model table; earlier entries are tried first
    #[serde(default = "default_models")]
    pub models: Vec<ProviderDescriptor>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}

/// The stock model table, most permissive first.
pub fn default_models() -> Vec<ProviderDescriptor> {
    vec![
        ProviderDescriptor::new(
            "deepseek/deepseek-chat-v3.1:free",
            "DeepSeek Chat v3.1",
            "Usually less restrictive",
        ),
        ProviderDescriptor::new(
            "deepseek/deepseek-r1-distill-llama-70b:free",
            "DeepSeek R1 Distill",
            "Alternative option",
        ),
        ProviderDescriptor::new(
            "meta-llama/llama-3.3-70b-instruct:free",
            "Llama 3.3 70B",
            "Meta's instruction model",
        ),
        ProviderDescriptor::new(
            "qwen/qwen-2.5-72b-instruct:free",
            "Qwen 2.5 72B",
            "Large model, good for deep analysis",
        ),
    ]
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
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("engine", &self.engine)
            .field("cache", &self.cache)
            .field("models", &self.models)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound for a single provider call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Send one throwaway call to the primary model before the first request
    #[serde(default = "default_true")]
    pub prewarm_on_first_request: bool,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            prewarm_on_first_request: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// "memory", "file", "sqlite" or "none"
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// How long a provider result stays valid
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,

    /// Storage location for durable backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_cache_backend() -> String {
    "memory".into()
}
fn default_ttl_days() -> u32 {
    7
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            ttl_days: default_ttl_days(),
            path: None,
        }
    }
}

impl CacheConfig {
    /// The configured path, or the backend's default under the config dir.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return PathBuf::from(path);
        }
        let dir = AppConfig::config_dir().join("cache");
        match self.backend.as_str() {
            "sqlite" => dir.join("responses.db"),
            _ => dir.join("responses.jsonl"),
        }
    }
}

const CACHE_BACKENDS: [&str; 4] = ["memory", "file", "sqlite", "none"];

/// Ten years; longer TTLs are rejected.
pub const MAX_TTL_DAYS: u32 = 3650;

/// One hour per attempt is already far beyond any provider's own limit.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

impl AppConfig {
    /// Load configuration from the default path (~/.thirdvoice/config.toml).
    ///
    /// Also checks environment variables:
    /// - `THIRDVOICE_API_KEY` (highest priority), then `OPENROUTER_API_KEY`
    /// - `THIRDVOICE_BASE_URL`
    /// - `THIRDVOICE_CACHE_BACKEND`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path, |name| std::env::var(name).ok())
    }

    /// Load from `path`, then apply overrides read through `env` and
    /// validate the merged result.
    pub fn load_with_env(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(env);
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

    fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        let non_blank = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        if !self.has_api_key() {
            self.api_key =
                non_blank("THIRDVOICE_API_KEY").or_else(|| non_blank("OPENROUTER_API_KEY"));
        }

        if let Some(url) = non_blank("THIRDVOICE_BASE_URL") {
            self.base_url = url;
        }

        if let Some(backend) = non_blank("THIRDVOICE_CACHE_BACKEND") {
            self.cache.backend = backend;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".thirdvoice")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.models.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one [[models]] entry is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.trim().is_empty() {
                return Err(ConfigError::ValidationError("model id must not be empty".into()));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate model id '{}'",
                    model.id
                )));
            }
        }

        if self.engine.request_timeout_secs == 0
            || self.engine.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS
        {
            return Err(ConfigError::ValidationError(format!(
                "engine.request_timeout_secs must be between 1 and {MAX_REQUEST_TIMEOUT_SECS}"
            )));
        }

        if self.cache.ttl_days == 0 || self.cache.ttl_days > MAX_TTL_DAYS {
            return Err(ConfigError::ValidationError(format!(
                "cache.ttl_days must be between 1 and {MAX_TTL_DAYS}"
            )));
        }

        if !CACHE_BACKENDS.contains(&self.cache.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown cache backend '{}' (expected one of {})",
                self.cache.backend,
                CACHE_BACKENDS.join(", ")
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            engine: EngineConfig::default(),
            cache: CacheConfig::default(),
            models: default_models(),
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
