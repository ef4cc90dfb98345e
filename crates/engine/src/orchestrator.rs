//! The analysis orchestrator.
//!
//! Per request: cache check → prompt build → model loop (parse fused into
//! acceptance) → store on success, canned fallback on exhaustion. `process`
//! never fails; every error along the way is logged and absorbed.

use crate::cache_key::request_key;
use crate::fallback::fallback;
use crate::parser::{self, ParsedCompletion};
use crate::prompts::build_prompts;
use chrono::Duration;
use std::sync::Arc;
use thirdvoice_core::{
    AnalysisRequest, AnalysisResult, CacheEntry, CacheStore, Depth, Operation, ProviderDescriptor,
    ResultSource,
};
use thirdvoice_providers::ModelInvoker;
use tokio::sync::OnceCell;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

const PREWARM_SYSTEM_PROMPT: &str = "You are ready.";
const PREWARM_USER_PROMPT: &str = "Ready";
const PREWARM_MAX_TOKENS: u32 = 5;

/// Turns analysis requests into results. Share it behind an `Arc`.
pub struct Orchestrator {
    invoker: ModelInvoker,
    cache: Arc<dyn CacheStore>,
    cache_ttl: Duration,
    prewarm_on_first_request: bool,
    prewarmed: OnceCell<bool>,
}

impl Orchestrator {
    /// Create an orchestrator with a 7-day cache TTL and no automatic prewarm.
    pub fn new(invoker: ModelInvoker, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            invoker,
            cache,
            cache_ttl: Duration::days(7),
            prewarm_on_first_request: false,
            prewarmed: OnceCell::new(),
        }
    }

    /// Build the provider, model table and engine settings from configuration.
    pub fn from_config(config: &thirdvoice_config::AppConfig, cache: Arc<dyn CacheStore>) -> Self {
        let provider = thirdvoice_providers::build_from_config(config);
        let invoker = ModelInvoker::new(provider, config.models.clone())
            .with_timeout(std::time::Duration::from_secs(config.engine.request_timeout_secs))
            .with_temperature(config.temperature);

        if !config.has_api_key() {
            warn!(
                "No API key configured (set THIRDVOICE_API_KEY or OPENROUTER_API_KEY); \
                 every request will be answered by the fallback generator"
            );
        }

        Self::new(invoker, cache)
            .with_cache_ttl(Duration::days(i64::from(config.cache.ttl_days)))
            .with_prewarm_on_first_request(config.engine.prewarm_on_first_request)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Run [`prewarm`](Self::prewarm) before the first request is handled.
    pub fn with_prewarm_on_first_request(mut self, enabled: bool) -> Self {
        self.prewarm_on_first_request = enabled;
        self
    }

    pub fn models(&self) -> &[ProviderDescriptor] {
        self.invoker.models()
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// True when no provider call can succeed: missing credentials or an
    /// empty model table.
    pub fn is_degraded(&self) -> bool {
        !self.invoker.is_configured() || self.invoker.models().is_empty()
    }

    /// One throwaway call to the primary model, at most once per orchestrator.
    ///
    /// Concurrent callers wait for the single in-flight attempt. Returns
    /// whether that attempt succeeded; a failure is not retried.
    pub async fn prewarm(&self) -> bool {
        *self
            .prewarmed
            .get_or_init(|| async {
                let Some(primary) = self.invoker.models().first() else {
                    return false;
                };
                info!(model = %primary.id, "Prewarming primary model");
                match self
                    .invoker
                    .attempt(
                        primary,
                        PREWARM_SYSTEM_PROMPT,
                        PREWARM_USER_PROMPT,
                        PREWARM_MAX_TOKENS,
                    )
                    .await
                {
                    Ok(_) => {
                        info!("Prewarm complete");
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, "Prewarm failed, continuing anyway");
                        false
                    }
                }
            })
            .await
    }

    /// Analyse or rewrite a message. Always returns a result.
    pub async fn process(&self, request: &AnalysisRequest) -> AnalysisResult {
        self.process_with_source(request).await.0
    }

    /// Like [`process`](Self::process), also reporting where the result came from.
    pub async fn process_with_source(
        &self,
        request: &AnalysisRequest,
    ) -> (AnalysisResult, ResultSource) {
        let span = info_span!(
            "analysis",
            request_id = %Uuid::new_v4(),
            operation = %request.operation(),
            depth = %request.depth(),
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: &AnalysisRequest) -> (AnalysisResult, ResultSource) {
        if self.prewarm_on_first_request {
            self.prewarm().await;
        }

        let key = request_key(request);

        match self.cache.get(&key).await {
            Ok(Some(entry)) => {
                info!(key = %key, model = %entry.result.provider_id, "Cache hit");
                let mut result = entry.result;
                let clamped = AnalysisResult::clamp_score(i64::from(result.healing_score));
                if clamped != result.healing_score {
                    warn!(
                        key = %key,
                        raw_score = result.healing_score,
                        "Cached score out of range, clamping"
                    );
                    result.healing_score = clamped;
                }
                result.from_cache = true;
                return (result, ResultSource::Cache);
            }
            Ok(None) => debug!(key = %key, "Cache miss"),
            Err(e) => warn!(key = %key, error = %e, "Cache lookup failed, treating as miss"),
        }

        let operation = request.operation();
        let depth = request.depth();
        let prompts = build_prompts(operation, depth, request.message(), request.context());

        let invocation = self
            .invoker
            .invoke_with(
                &prompts.system_prompt,
                &prompts.user_prompts,
                prompts.max_tokens,
                |text, descriptor| parser::parse(text, operation, depth, descriptor),
            )
            .await;

        let Some(invocation) = invocation else {
            warn!("All models failed, using fallback result");
            return (
                fallback(request.message(), operation, depth),
                ResultSource::Fallback,
            );
        };

        info!(
            model = %invocation.descriptor.id,
            attempts = invocation.attempts,
            "Analysis complete"
        );
        let result = ParsedCompletion::into_result(invocation.value);
        self.store(key, &result, request).await;
        (result, ResultSource::Provider)
    }

    async fn store(&self, key: String, result: &AnalysisResult, request: &AnalysisRequest) {
        let entry = CacheEntry::new(key, result.clone(), self.cache_ttl)
            .with_owner(request.subject_id(), request.requester_id());
        if let Err(e) = self.cache.put(entry).await {
            warn!(error = %e, "Failed to cache result");
        }
    }

    /// Quick interpretation of what someone meant.
    pub async fn quick_analyze(
        &self,
        message: &str,
        context: &str,
        subject_id: &str,
        requester_id: &str,
    ) -> AnalysisResult {
        let request = owned_request(
            message,
            context,
            Operation::Interpret,
            Depth::Quick,
            subject_id,
            requester_id,
        );
        self.process(&request).await
    }

    /// Deep interpretation with communication patterns and relationship dynamics.
    pub async fn deep_analyze(
        &self,
        message: &str,
        context: &str,
        subject_id: &str,
        requester_id: &str,
    ) -> AnalysisResult {
        let request = owned_request(
            message,
            context,
            Operation::Interpret,
            Depth::Deep,
            subject_id,
            requester_id,
        );
        self.process(&request).await
    }

    /// Constructive rewrite of the sender's own message.
    pub async fn rewrite(
        &self,
        message: &str,
        context: &str,
        subject_id: &str,
        requester_id: &str,
    ) -> AnalysisResult {
        let request = owned_request(
            message,
            context,
            Operation::Rewrite,
            Depth::Quick,
            subject_id,
            requester_id,
        );
        self.process(&request).await
    }
}

fn owned_request(
    message: &str,
    context: &str,
    operation: Operation,
    depth: Depth,
    subject_id: &str,
    requester_id: &str,
) -> AnalysisRequest {
    AnalysisRequest::new(message, context, operation, depth)
        .with_subject(subject_id)
        .with_requester(requester_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use thirdvoice_cache::InMemoryCache;
    use thirdvoice_core::error::{CacheError, ProviderError};
    use thirdvoice_core::provider::{Provider, ProviderRequest, ProviderResponse};

    type Responder =
        Box<dyn Fn(&ProviderRequest, usize) -> Result<String, ProviderError> + Send + Sync>;

    /// Answers via a closure over (request, call index) and records every request.
    struct StubProvider {
        responder: Responder,
        configured: bool,
        calls: Mutex<Vec<ProviderRequest>>,
    }

    impl StubProvider {
        fn new(
            responder: impl Fn(&ProviderRequest, usize) -> Result<String, ProviderError>
                + Send
                + Sync
                + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                configured: true,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn always(text: &'static str) -> Self {
            Self::new(move |_, _| Ok(text.to_string()))
        }

        fn failing() -> Self {
            Self::new(|_, _| {
                Err(ProviderError::ApiError {
                    status_code: 503,
                    message: "unavailable".into(),
                })
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn user_prompts(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.messages[1].content.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            let index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(request.clone());
                calls.len() - 1
            };
            (self.responder)(&request, index).map(|content| ProviderResponse {
                content,
                usage: None,
                model: request.model.clone(),
            })
        }
    }

    /// A cache whose every operation fails.
    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        fn name(&self) -> &str {
            "broken"
        }
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
            Err(CacheError::Storage("disk on fire".into()))
        }
        async fn put(&self, _entry: CacheEntry) -> Result<(), CacheError> {
            Err(CacheError::Storage("disk on fire".into()))
        }
        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::Storage("disk on fire".into()))
        }
        async fn purge_expired(&self) -> Result<usize, CacheError> {
            Err(CacheError::Storage("disk on fire".into()))
        }
        async fn purge_requester(&self, _requester_id: &str) -> Result<usize, CacheError> {
            Err(CacheError::Storage("disk on fire".into()))
        }
        async fn count(&self) -> Result<usize, CacheError> {
            Err(CacheError::Storage("disk on fire".into()))
        }
    }

    fn models() -> Vec<ProviderDescriptor> {
        vec![
            ProviderDescriptor::new("deepseek/deepseek-chat-v3.1:free", "DeepSeek Chat v3.1", ""),
            ProviderDescriptor::new("qwen/qwen-2.5-72b-instruct:free", "Qwen 2.5 72B", ""),
        ]
    }

    fn orchestrator(provider: Arc<StubProvider>, cache: Arc<dyn CacheStore>) -> Orchestrator {
        Orchestrator::new(ModelInvoker::new(provider, models()), cache)
    }

    const INTERPRET_JSON: &str = r#"{"explanation": "They feel unheard", "suggested_responses": ["I hear you"], "healing_score": 7, "sentiment": "negative"}"#;
    const REWRITE_JSON: &str = r#"{"rewritten_text": "Can we talk about this calmly?", "alternatives": ["I'd like to understand you."], "healing_score": 8}"#;

    fn interpret(message: &str) -> AnalysisRequest {
        AnalysisRequest::new(message, "romantic", Operation::Interpret, Depth::Quick)
    }

    #[tokio::test]
    async fn provider_result_is_parsed_and_cached() {
        let provider = Arc::new(StubProvider::always(INTERPRET_JSON));
        let cache = Arc::new(InMemoryCache::new());
        let orch = orchestrator(provider.clone(), cache.clone());

        let (result, source) = orch.process_with_source(&interpret("You never listen")).await;
        assert_eq!(source, ResultSource::Provider);
        assert_eq!(result.explanation, "They feel unheard");
        assert_eq!(result.provider_used, "DeepSeek Chat v3.1");
        assert!(!result.from_cache);
        assert_eq!(cache.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn second_identical_request_is_served_from_cache() {
        let provider = Arc::new(StubProvider::always(REWRITE_JSON));
        let orch = orchestrator(provider.clone(), Arc::new(InMemoryCache::new()));
        let request =
            AnalysisRequest::new("You're useless", "workplace", Operation::Rewrite, Depth::Quick);

        let (first, _) = orch.process_with_source(&request).await;
        let (second, source) = orch.process_with_source(&request).await;

        assert_eq!(source, ResultSource::Cache);
        assert!(second.from_cache);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn depth_is_part_of_the_cache_key() {
        let provider = Arc::new(StubProvider::always(INTERPRET_JSON));
        let orch = orchestrator(provider.clone(), Arc::new(InMemoryCache::new()));

        orch.quick_analyze("hello", "friend", "c", "u").await;
        orch.deep_analyze("hello", "friend", "c", "u").await;
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_models_fall_back_without_caching() {
        let provider = Arc::new(StubProvider::failing());
        let cache = Arc::new(InMemoryCache::new());
        let orch = orchestrator(provider.clone(), cache.clone());

        let (result, source) = orch.process_with_source(&interpret("hi")).await;
        assert_eq!(source, ResultSource::Fallback);
        assert_eq!(result.provider_id, "fallback");
        assert_eq!(provider.call_count(), 4);
        assert_eq!(cache.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn parse_failure_falls_through_to_sanitized_variant() {
        let provider = Arc::new(StubProvider::new(|_, i| {
            Ok(if i == 0 {
                "I'm sorry, I can't help with that.".to_string()
            } else {
                INTERPRET_JSON.to_string()
            })
        }));
        let orch = orchestrator(provider.clone(), Arc::new(InMemoryCache::new()));

        let (result, source) = orch.process_with_source(&interpret("you bitch")).await;
        assert_eq!(source, ResultSource::Provider);
        assert_eq!(result.provider_id, "deepseek/deepseek-chat-v3.1:free");

        let prompts = provider.user_prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("you bitch"));
        assert!(prompts[1].contains("you [expletive]"));
    }

    #[tokio::test]
    async fn out_of_range_score_is_clamped() {
        let provider = Arc::new(StubProvider::always(
            r#"{"explanation": "x", "healing_score": 42}"#,
        ));
        let orch = orchestrator(provider, Arc::new(InMemoryCache::new()));
        let result = orch.process(&interpret("hi")).await;
        assert_eq!(result.healing_score, 10);
    }

    #[tokio::test]
    async fn missing_responses_get_defaults() {
        let provider = Arc::new(StubProvider::always(r#"{"explanation": "x"}"#));
        let orch = orchestrator(provider, Arc::new(InMemoryCache::new()));
        let result = orch.process(&interpret("hi")).await;
        assert!(!result.suggested_responses.is_empty());
    }

    #[tokio::test]
    async fn broken_cache_does_not_change_the_result() {
        let provider = Arc::new(StubProvider::always(INTERPRET_JSON));
        let orch = orchestrator(provider.clone(), Arc::new(BrokenCache));

        let (result, source) = orch.process_with_source(&interpret("hi")).await;
        assert_eq!(source, ResultSource::Provider);
        assert_eq!(result.explanation, "They feel unheard");

        // Every lookup misses, so the provider is asked again.
        orch.process(&interpret("hi")).await;
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let provider = Arc::new(StubProvider::always(INTERPRET_JSON));
        let cache = Arc::new(InMemoryCache::new());
        let request = interpret("hello again");
        let stale = AnalysisResult {
            explanation: "stale".into(),
            ..Default::default()
        };
        cache
            .put(CacheEntry::new(request_key(&request), stale, Duration::seconds(-1)))
            .await
            .unwrap();

        let orch = orchestrator(provider.clone(), cache);
        let result = orch.process(&request).await;
        assert_eq!(result.explanation, "They feel unheard");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn out_of_range_cached_score_is_clamped() {
        let provider = Arc::new(StubProvider::failing());
        let cache = Arc::new(InMemoryCache::new());
        let request = interpret("edited by hand");
        let tampered = AnalysisResult {
            explanation: "from disk".into(),
            healing_score: 42,
            suggested_responses: vec!["ok".into()],
            ..Default::default()
        };
        cache
            .put(CacheEntry::new(request_key(&request), tampered, Duration::days(1)))
            .await
            .unwrap();

        let orch = orchestrator(provider.clone(), cache);
        let (result, source) = orch.process_with_source(&request).await;
        assert_eq!(source, ResultSource::Cache);
        assert_eq!(result.explanation, "from disk");
        assert_eq!(result.healing_score, 10);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn huge_ttl_still_caches() {
        let provider = Arc::new(StubProvider::always(INTERPRET_JSON));
        let cache = Arc::new(InMemoryCache::new());
        let orch = orchestrator(provider.clone(), cache.clone())
            .with_cache_ttl(Duration::days(i64::from(u32::MAX)));
        let request = interpret("keep this forever");

        let (first, first_source) = orch.process_with_source(&request).await;
        let (_, second_source) = orch.process_with_source(&request).await;

        assert_eq!(first_source, ResultSource::Provider);
        assert_eq!(first.explanation, "They feel unheard");
        assert_eq!(second_source, ResultSource::Cache);
        assert_eq!(provider.call_count(), 1);

        let entry = cache.get(&request_key(&request)).await.unwrap().unwrap();
        assert_eq!(entry.expires_at, thirdvoice_core::cache::latest_expiry());
    }

    #[tokio::test]
    async fn cache_entries_record_the_owner() {
        let provider = Arc::new(StubProvider::always(REWRITE_JSON));
        let cache = Arc::new(InMemoryCache::new());
        let orch = orchestrator(provider, cache.clone());

        orch.rewrite("Stop it", "family", "contact-1", "user-1").await;
        assert_eq!(cache.purge_requester("user-1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn prewarm_runs_once_under_concurrency() {
        let provider = Arc::new(StubProvider::always(INTERPRET_JSON));
        let orch = Arc::new(
            orchestrator(provider.clone(), Arc::new(InMemoryCache::new()))
                .with_prewarm_on_first_request(true),
        );

        let tasks = (0..8).map(|i| {
            let orch = orch.clone();
            tokio::spawn(async move { orch.process(&interpret(&format!("message {i}"))).await })
        });
        for result in futures::future::join_all(tasks).await {
            assert!(!result.unwrap().is_fallback());
        }

        let prewarms = provider
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.messages[0].content == PREWARM_SYSTEM_PROMPT)
            .count();
        assert_eq!(prewarms, 1);
        assert_eq!(provider.call_count(), 9);
        assert!(orch.prewarm().await);
    }

    #[tokio::test]
    async fn prewarm_failure_is_not_retried() {
        let provider = Arc::new(StubProvider::failing());
        let orch = orchestrator(provider.clone(), Arc::new(InMemoryCache::new()));

        assert!(!orch.prewarm().await);
        assert!(!orch.prewarm().await);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn unconfigured_provider_is_degraded() {
        let mut stub = StubProvider::failing();
        stub.configured = false;
        let orch = orchestrator(Arc::new(stub), Arc::new(InMemoryCache::new()));
        assert!(orch.is_degraded());

        let result = orch.process(&interpret("hi")).await;
        assert!(result.is_fallback());
    }

    #[tokio::test]
    async fn empty_model_table_is_degraded() {
        let provider = Arc::new(StubProvider::always(INTERPRET_JSON));
        let orch = Orchestrator::new(
            ModelInvoker::new(provider, Vec::new()),
            Arc::new(InMemoryCache::new()),
        );
        assert!(orch.is_degraded());
        assert!(orch.process(&interpret("hi")).await.is_fallback());
    }

    #[tokio::test]
    async fn from_config_without_key_warns_and_degrades() {
        let config = thirdvoice_config::AppConfig::default();
        let orch = Orchestrator::from_config(&config, Arc::new(InMemoryCache::new()))
            .with_prewarm_on_first_request(false);
        assert!(orch.is_degraded());
        assert_eq!(orch.models().len(), 4);

        // NotConfigured short-circuits every attempt without network I/O.
        let result = orch.process(&interpret("I'm really struggling")).await;
        assert!(result.is_fallback());
    }
}
