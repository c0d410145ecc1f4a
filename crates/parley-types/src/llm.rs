//! Completion-provider request types and error taxonomy.
//!
//! The pipeline hands the provider an ordered list of role/content pairs;
//! the provider answers with generated text or an [`UpstreamError`] that is
//! either transient (eligible for retry) or permanent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::Role;

/// A single role/content pair sent to the completion provider.
///
/// Closed two-field record; the role is the storage enumeration, never a
/// free-form mapping. A system prompt travels outside this list and is
/// prepended by the client at the wire boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Errors from the completion provider.
///
/// `Timeout` and `Connection` are the transient class: the retry policy may
/// re-issue the call. Everything else propagates immediately.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("authentication failed")]
    Authentication,

    #[error("rate limited")]
    RateLimited,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("provider error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl UpstreamError {
    /// Whether this failure class is eligible for automatic retry.
    ///
    /// Only network-level failures qualify; auth, validation, and provider
    /// errors (including rate limits without a retry hint) are permanent.
    pub fn is_transient(&self) -> bool {
        matches!(self, UpstreamError::Timeout(_) | UpstreamError::Connection(_))
    }
}
