//! Provider construction from configuration.
//!
//! Third Voice talks to a single OpenAI-compatible endpoint; which model
//! answers is chosen per attempt from the descriptor table.

use std::sync::Arc;
use std::time::Duration;
use thirdvoice_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider described by the configuration.
///
/// A missing API key still yields a provider; it reports
/// `is_configured() == false` and refuses every call without network I/O.
pub fn build_from_config(config: &thirdvoice_config::AppConfig) -> Arc<dyn Provider> {
    let api_key = config.api_key.clone().unwrap_or_default();

    let base_url = if config.base_url.trim().is_empty() {
        default_base_url(&config.provider)
    } else {
        config.base_url.clone()
    };

    // The HTTP client gets a little headroom over the per-attempt deadline,
    // which is enforced by the invoker.
    let client_timeout = Duration::from_secs(config.engine.request_timeout_secs.saturating_add(5));

    Arc::new(
        OpenAiCompatProvider::new(&config.provider, base_url, api_key)
            .with_timeout(client_timeout),
    )
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => "https://openrouter.ai/api/v1".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
        assert!(default_base_url("something-else").contains("openrouter.ai"));
    }

    #[test]
    fn build_without_key_is_unconfigured() {
        let config = thirdvoice_config::AppConfig::default();
        let provider = build_from_config(&config);
        assert_eq!(provider.name(), "openrouter");
        assert!(!provider.is_configured());
    }

    #[test]
    fn build_with_key_is_configured() {
        let config = thirdvoice_config::AppConfig {
            api_key: Some("sk-or-test".into()),
            ..Default::default()
        };
        assert!(build_from_config(&config).is_configured());
    }

    #[test]
    fn huge_timeout_does_not_overflow() {
        let mut config = thirdvoice_config::AppConfig::default();
        config.engine.request_timeout_secs = u64::MAX;
        assert!(!build_from_config(&config).is_configured());
    }
}
