//! The message pipeline: one inbound user message becomes a persisted,
//! context-aware completion call.
//!
//! ChatPipeline coordinates the ConversationStore and CompletionClient:
//! resolve the conversation, persist the user turn, build the context
//! window, invoke the provider, persist the assistant turn. Every failure
//! path returns a structured [`PipelineError`] carrying the conversation id
//! established so far -- nothing escapes the pipeline boundary unlabeled.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use parley_types::chat::{ConversationHistory, ConversationSummary, Message, Role};
use parley_types::error::StoreError;
use parley_types::llm::{PromptMessage, UpstreamError};

use crate::chat::store::ConversationStore;
use crate::llm::client::CompletionClient;

/// Number of recent messages supplied to the provider as context.
pub const DEFAULT_CONTEXT_WINDOW: i64 = 10;

/// Maximum accepted message length, in characters (boundary-inclusive).
pub const MAX_MESSAGE_CHARS: usize = 10_000;

/// Titles derived from a first message are truncated to this many characters.
const TITLE_MAX_CHARS: usize = 50;

/// Failure inside the pipeline, by layer.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Malformed input, rejected before any persistence or network call.
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// A pipeline failure annotated with the conversation id established so far.
///
/// `conversation_id` is `None` only when conversation creation itself
/// failed (or validation rejected the input before resolution).
#[derive(Debug, Error)]
#[error("{source}")]
pub struct PipelineError {
    pub conversation_id: Option<i64>,
    #[source]
    pub source: ChatError,
}

impl PipelineError {
    fn new(conversation_id: Option<i64>, source: impl Into<ChatError>) -> Self {
        Self {
            conversation_id,
            source: source.into(),
        }
    }
}

/// Successful outcome of [`ChatPipeline::process_message`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub conversation_id: i64,
    /// The persisted assistant message.
    pub message: Message,
}

/// Health of a single dependency, as reported by the health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Ok,
    Error,
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentStatus::Ok => write!(f, "ok"),
            ComponentStatus::Error => write!(f, "error"),
        }
    }
}

/// Aggregate component health. Each sub-check is independent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub storage: ComponentStatus,
    pub completion_api: ComponentStatus,
}

/// Orchestrates the store and the completion client for one request at a
/// time.
///
/// Stateless across requests: the only durable state is the conversation row
/// in the store. Constructed once at process start and shared by reference;
/// generic over the two ports so core never depends on infra.
pub struct ChatPipeline<S: ConversationStore, C: CompletionClient> {
    store: S,
    client: C,
    context_window: i64,
}

impl<S: ConversationStore, C: CompletionClient> ChatPipeline<S, C> {
    /// Create a pipeline with the default context window.
    pub fn new(store: S, client: C) -> Self {
        Self {
            store,
            client,
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }

    /// Override the context window size.
    pub fn with_context_window(mut self, n: i64) -> Self {
        self.context_window = n;
        self
    }

    /// Access the conversation store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process one inbound user message: persist it, call the provider with
    /// recent context, persist the reply.
    ///
    /// When `conversation_id` is `None` a conversation is created with a
    /// title derived from the message. A failed provider call leaves the
    /// already-persisted user turn in place; history is never rolled back.
    pub async fn process_message(
        &self,
        content: &str,
        conversation_id: Option<i64>,
        temperature: f64,
        system_prompt: Option<&str>,
        owner_id: Option<&str>,
    ) -> Result<ChatReply, PipelineError> {
        validate_message(content, temperature)
            .map_err(|e| PipelineError::new(conversation_id, e))?;

        // Resolve the conversation before touching message state.
        let conversation_id = match conversation_id {
            Some(id) => id,
            None => {
                let title = derive_title(content);
                let id = self
                    .store
                    .create_conversation(owner_id, &title)
                    .await
                    .map_err(|e| PipelineError::new(None, e))?;
                info!(conversation_id = id, "created conversation");
                id
            }
        };

        let user_message = self
            .store
            .append_message(conversation_id, Role::User, content)
            .await
            .map_err(|e| PipelineError::new(Some(conversation_id), e))?;
        debug!(
            conversation_id,
            message_id = user_message.id,
            "persisted user turn"
        );

        // Context window includes the user turn just appended.
        let recent = self
            .store
            .recent_messages(conversation_id, self.context_window)
            .await
            .map_err(|e| PipelineError::new(Some(conversation_id), e))?;
        let context: Vec<PromptMessage> = recent
            .iter()
            .map(|m| PromptMessage::new(m.role, m.content.clone()))
            .collect();
        debug!(conversation_id, context_len = context.len(), "built context window");

        let reply_text = self
            .client
            .complete(&context, temperature, system_prompt)
            .await
            .map_err(|e| {
                error!(conversation_id, error = %e, "completion failed");
                PipelineError::new(Some(conversation_id), e)
            })?;

        let assistant_message = self
            .store
            .append_message(conversation_id, Role::Assistant, &reply_text)
            .await
            .map_err(|e| PipelineError::new(Some(conversation_id), e))?;
        debug!(
            conversation_id,
            message_id = assistant_message.id,
            "persisted assistant turn"
        );

        Ok(ChatReply {
            conversation_id,
            message: assistant_message,
        })
    }

    /// Full conversation history with messages, or `None` when absent.
    pub async fn get_history(
        &self,
        conversation_id: i64,
    ) -> Result<Option<ConversationHistory>, StoreError> {
        self.store.get_conversation(conversation_id).await
    }

    /// Conversation summaries, newest-updated first.
    pub async fn list_conversations(
        &self,
        limit: i64,
        offset: i64,
        owner_id: Option<&str>,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        self.store.list_conversations(limit, offset, owner_id).await
    }

    /// Delete a conversation and its messages. True iff it existed.
    pub async fn delete_conversation(&self, conversation_id: i64) -> Result<bool, StoreError> {
        let deleted = self.store.delete_conversation(conversation_id).await?;
        if deleted {
            info!(conversation_id, "deleted conversation");
        }
        Ok(deleted)
    }

    /// Probe both dependencies independently; one failing does not prevent
    /// checking the other, and failures never propagate as errors.
    pub async fn health_check(&self) -> HealthStatus {
        let storage = match self.store.ensure_schema().await {
            Ok(()) => ComponentStatus::Ok,
            Err(e) => {
                error!(error = %e, "storage health check failed");
                ComponentStatus::Error
            }
        };

        let completion_api = if self.client.health_check().await {
            ComponentStatus::Ok
        } else {
            ComponentStatus::Error
        };

        HealthStatus {
            storage,
            completion_api,
        }
    }
}

fn validate_message(content: &str, temperature: f64) -> Result<(), ChatError> {
    let chars = content.chars().count();
    if chars == 0 {
        return Err(ChatError::Validation("message must not be empty".into()));
    }
    if chars > MAX_MESSAGE_CHARS {
        return Err(ChatError::Validation(format!(
            "message exceeds {MAX_MESSAGE_CHARS} characters ({chars})"
        )));
    }
    if !(0.0..=1.0).contains(&temperature) {
        return Err(ChatError::Validation(format!(
            "temperature must be within [0, 1], got {temperature}"
        )));
    }
    Ok(())
}

/// Title for a new conversation: the first message truncated to 50
/// characters, with an ellipsis appended when truncated.
fn derive_title(content: &str) -> String {
    let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
    if content.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}
