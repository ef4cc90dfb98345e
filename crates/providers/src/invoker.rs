//! Model invoker: ordered attempts across the descriptor table.
//!
//! For each model in table order, each user-prompt variant is tried in
//! order. The first completion the caller accepts ends the loop. Failures of
//! any kind (transport, status, empty choices, timeout, rejected content)
//! move on to the next attempt; nothing is retried in place.

use std::sync::Arc;
use std::time::Duration;
use thirdvoice_core::analysis::ProviderDescriptor;
use thirdvoice_core::error::{Error, ProviderError};
use thirdvoice_core::provider::{Provider, ProviderRequest};
use tracing::{debug, info, warn};

/// The outcome of a successful invocation.
#[derive(Debug, Clone)]
pub struct Invocation<T> {
    /// Whatever the acceptance function produced from the completion
    pub value: T,

    /// The model that produced it
    pub descriptor: ProviderDescriptor,

    /// Number of attempts made, the successful one included
    pub attempts: usize,
}

/// Walks the model table against one provider endpoint.
pub struct ModelInvoker {
    provider: Arc<dyn Provider>,
    models: Vec<ProviderDescriptor>,
    timeout: Duration,
    temperature: f32,
}

impl ModelInvoker {
    /// Create an invoker with a 30s per-attempt deadline.
    pub fn new(provider: Arc<dyn Provider>, models: Vec<ProviderDescriptor>) -> Self {
        Self {
            provider,
            models,
            timeout: Duration::from_secs(30),
            temperature: 0.7,
        }
    }

    /// Set the per-attempt deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sampling temperature used for every attempt.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The descriptor table, in priority order.
    pub fn models(&self) -> &[ProviderDescriptor] {
        &self.models
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// One bounded call against one model.
    pub async fn attempt(
        &self,
        descriptor: &ProviderDescriptor,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> std::result::Result<String, ProviderError> {
        let request = ProviderRequest::chat(
            &descriptor.id,
            system_prompt,
            user_prompt,
            max_tokens,
            self.temperature,
        );

        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => Ok(response.content),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProviderError::Timeout(format!(
                "model '{}' did not answer within {}ms",
                descriptor.id,
                self.timeout.as_millis()
            ))),
        }
    }

    /// Return the first raw completion from any model and variant.
    pub async fn invoke(
        &self,
        system_prompt: &str,
        variants: &[String],
        max_tokens: u32,
    ) -> Option<Invocation<String>> {
        self.invoke_with(system_prompt, variants, max_tokens, |text, _| {
            Ok::<_, Error>(text.to_string())
        })
        .await
    }

    /// One call plus acceptance; either kind of failure becomes an [`Error`].
    async fn attempt_accepted<T, E, F>(
        &self,
        descriptor: &ProviderDescriptor,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        accept: &mut F,
    ) -> thirdvoice_core::Result<T>
    where
        E: Into<Error>,
        F: FnMut(&str, &ProviderDescriptor) -> std::result::Result<T, E>,
    {
        let text = self
            .attempt(descriptor, system_prompt, user_prompt, max_tokens)
            .await?;
        accept(&text, descriptor).map_err(Into::into)
    }

    /// Return the first completion that `accept` turns into a value.
    ///
    /// A rejection is logged and treated exactly like a failed call. Anything
    /// convertible into [`Error`] can reject, typically a `ParseError`.
    pub async fn invoke_with<T, E, F>(
        &self,
        system_prompt: &str,
        variants: &[String],
        max_tokens: u32,
        mut accept: F,
    ) -> Option<Invocation<T>>
    where
        E: Into<Error>,
        F: FnMut(&str, &ProviderDescriptor) -> std::result::Result<T, E>,
    {
        let total = self.models.len() * variants.len();
        let mut attempts = 0;

        for descriptor in &self.models {
            for (v, user_prompt) in variants.iter().enumerate() {
                attempts += 1;
                info!(
                    model = %descriptor.id,
                    variant = v + 1,
                    attempt = attempts,
                    total,
                    "Invoking model"
                );

                let outcome = self
                    .attempt_accepted(
                        descriptor,
                        system_prompt,
                        user_prompt,
                        max_tokens,
                        &mut accept,
                    )
                    .await;
                match outcome {
                    Ok(value) => {
                        debug!(model = %descriptor.id, attempts, "Completion accepted");
                        return Some(Invocation {
                            value,
                            descriptor: descriptor.clone(),
                            attempts,
                        });
                    }
                    Err(e) => {
                        warn!(
                            model = %descriptor.id,
                            variant = v + 1,
                            error = %e,
                            "Model attempt failed, trying next"
                        );
                    }
                }
            }
        }

        warn!(attempts, "All models exhausted");
        None
    }
}
