//! Error types for the Third Voice domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Third Voice operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Cache errors ---
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    // --- Completion parsing errors ---
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider returned no completion choices for model {0}")]
    EmptyChoices(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cache payload could not be (de)serialized: {0}")]
    Serialization(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Why a completion could not be turned into an analysis.
///
/// The orchestrator treats every variant exactly like a failed provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no JSON object found in completion")]
    NoJsonObject,

    #[error("embedded JSON is invalid: {0}")]
    InvalidJson(String),

    #[error("JSON object lacks required content: {0}")]
    MissingContent(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn parse_error_converts_into_top_level() {
        let err: Error = ParseError::MissingContent("rewritten_text".into()).into();
        assert!(err.to_string().contains("rewritten_text"));
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn empty_choices_names_the_model() {
        let err = ProviderError::EmptyChoices("qwen/qwen-2.5-72b-instruct:free".into());
        assert!(err.to_string().contains("qwen-2.5-72b"));
    }
}
