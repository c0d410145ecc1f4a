//! CompletionClient trait definition.
//!
//! The port for the remote completion provider. Implementations live in
//! parley-infra (e.g., `OpenAiCompatClient`) and own the retry boundary, so
//! the pipeline only ever sees "succeeded" or one terminal failure.

use parley_types::llm::{PromptMessage, UpstreamError};

/// Client trait for the upstream completion API.
pub trait CompletionClient: Send + Sync {
    /// Send the ordered context to the provider and return its generated
    /// text.
    ///
    /// When `system_prompt` is present it is prepended as a distinguished
    /// leading entry ahead of `context`, never merged into user content.
    /// Transient failures are retried internally per the client's policy;
    /// the returned error is terminal.
    fn complete(
        &self,
        context: &[PromptMessage],
        temperature: f64,
        system_prompt: Option<&str>,
    ) -> impl std::future::Future<Output = Result<String, UpstreamError>> + Send;

    /// Issue a minimal low-cost completion and report reachability.
    ///
    /// Failures are swallowed into `false`, never propagated.
    fn health_check(&self) -> impl std::future::Future<Output = bool> + Send;
}
