//! ConversationStore trait definition.
//!
//! Durable persistence for conversations and messages. Implementations live
//! in parley-infra (e.g., `SqliteConversationStore`). Uses native async fn
//! in traits (RPITIT, Rust 2024 edition).

use parley_types::chat::{ConversationHistory, ConversationSummary, Message, Role};
use parley_types::error::StoreError;

/// Repository trait for conversation and message persistence.
///
/// The store exclusively owns persisted state; callers hold only transient
/// views during one request. Each operation acquires and releases whatever
/// connection it needs -- no session is held across calls.
pub trait ConversationStore: Send + Sync {
    /// Idempotently create the persisted layout (tables and indexes).
    ///
    /// Safe to call repeatedly and concurrently at process start. Also
    /// doubles as the storage reachability probe for health checks.
    fn ensure_schema(
        &self,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Create a conversation, returning its assigned id.
    ///
    /// Fails only when the underlying storage is unavailable.
    fn create_conversation(
        &self,
        owner_id: Option<&str>,
        title: &str,
    ) -> impl std::future::Future<Output = Result<i64, StoreError>> + Send;

    /// Append a message and bump the conversation's `updated_at` to at
    /// least the message timestamp, atomically (both writes or neither).
    /// `updated_at` never moves backwards, even when concurrent appends
    /// commit out of timestamp order.
    ///
    /// Fails with [`StoreError::NotFound`] when the conversation does not
    /// exist; orphaned inserts are rejected.
    fn append_message(
        &self,
        conversation_id: i64,
        role: Role,
        content: &str,
    ) -> impl std::future::Future<Output = Result<Message, StoreError>> + Send;

    /// Get a conversation with all its messages, ascending by timestamp.
    fn get_conversation(
        &self,
        conversation_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<ConversationHistory>, StoreError>> + Send;

    /// List conversation summaries, newest-updated first.
    ///
    /// `limit`/`offset` apply after filtering by `owner_id` when present.
    fn list_conversations(
        &self,
        limit: i64,
        offset: i64,
        owner_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationSummary>, StoreError>> + Send;

    /// Delete a conversation, cascading to its messages.
    ///
    /// Returns true iff a row existed and was removed.
    fn delete_conversation(
        &self,
        conversation_id: i64,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Get the newest `n` messages of a conversation, re-ordered ascending
    /// by timestamp -- the context window.
    fn recent_messages(
        &self,
        conversation_id: i64,
        n: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, StoreError>> + Send;
}
