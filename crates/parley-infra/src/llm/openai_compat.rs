//! OpenAiCompatClient -- concrete [`CompletionClient`] for any provider
//! speaking the OpenAI chat completions protocol (DeepSeek, OpenAI, ...).
//!
//! Owns the retry boundary: transient network failures are retried with the
//! crate's [`RetryPolicy`] so callers only ever see one terminal outcome.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use parley_core::llm::client::CompletionClient;
use parley_core::llm::retry::{run_with_retry, RetryPolicy};
use parley_types::llm::{PromptMessage, UpstreamError};

use super::types::{ChatCompletionRequest, ChatCompletionResponse, WireMessage};

/// Default base URL: DeepSeek's OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Client for an OpenAI-compatible chat completions API.
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    policy: RetryPolicy,
}

// OpenAiCompatClient intentionally does NOT derive Debug so the API key can
// never leak through formatting, even indirectly.

impl OpenAiCompatClient {
    /// Create a new client.
    ///
    /// `timeout` bounds each individual completion attempt; an exceeded
    /// timeout is a transient failure eligible for retry.
    pub fn new(api_key: SecretString, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            policy: RetryPolicy::default(),
        })
    }

    /// Override the base URL (other providers, proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// One attempt: POST the request and parse the generated text.
    async fn complete_once(
        &self,
        messages: &[WireMessage],
        temperature: f64,
        max_tokens: Option<u32>,
    ) -> Result<String, UpstreamError> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, error_body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Deserialization(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                UpstreamError::Deserialization("response contained no choices".to_string())
            })
    }
}

/// Map a reqwest transport failure onto the taxonomy. Timeouts and
/// connection errors are the transient class.
fn map_request_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout(e.to_string())
    } else {
        UpstreamError::Connection(e.to_string())
    }
}

/// Classify a non-success HTTP status. Nothing here is retryable: a rate
/// limit without a retry hint is treated as permanent.
fn classify_status(status: StatusCode, body: String) -> UpstreamError {
    match status.as_u16() {
        401 | 403 => UpstreamError::Authentication,
        429 => UpstreamError::RateLimited,
        400 | 404 | 422 => UpstreamError::InvalidRequest(body),
        code => UpstreamError::Api {
            status: code,
            message: body,
        },
    }
}

impl CompletionClient for OpenAiCompatClient {
    async fn complete(
        &self,
        context: &[PromptMessage],
        temperature: f64,
        system_prompt: Option<&str>,
    ) -> Result<String, UpstreamError> {
        let mut messages = Vec::with_capacity(context.len() + 1);
        if let Some(system) = system_prompt {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.extend(context.iter().map(|m| WireMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        }));

        debug!(
            model = %self.model,
            context_len = context.len(),
            "sending completion request"
        );

        run_with_retry(&self.policy, |_attempt| {
            self.complete_once(&messages, temperature, None)
        })
        .await
    }

    async fn health_check(&self) -> bool {
        let probe = [WireMessage {
            role: "user".to_string(),
            content: "ping".to_string(),
        }];

        // Small fixed token budget keeps the probe cheap. Single attempt:
        // a health check should reflect current reachability, not retry
        // its way to green.
        match self.complete_once(&probe, 0.1, Some(5)).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "completion API health check failed");
                false
            }
        }
    }
}
