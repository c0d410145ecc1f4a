//! SQLite conversation store implementation.
//!
//! Implements `ConversationStore` from `parley-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, RFC 3339 timestamp
//! text. The message-insert-plus-conversation-touch in `append_message` is
//! one transaction -- both effects visible or neither.

use chrono::{DateTime, Utc};
use sqlx::Row;

use parley_core::chat::store::ConversationStore;
use parley_types::chat::{Conversation, ConversationHistory, ConversationSummary, Message, Role};
use parley_types::error::StoreError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationStore`.
pub struct SqliteConversationStore {
    pool: DatabasePool,
}

impl SqliteConversationStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ConversationRow {
    id: i64,
    owner_id: Option<String>,
    title: String,
    created_at: String,
    updated_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, StoreError> {
        Ok(Conversation {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct MessageRow {
    id: i64,
    conversation_id: i64,
    role: String,
    content: String,
    timestamp: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            timestamp: row.try_get("timestamp")?,
        })
    }

    fn into_message(self) -> Result<Message, StoreError> {
        let role: Role = self.role.parse().map_err(StoreError::Query)?;
        Ok(Message {
            id: self.id,
            conversation_id: self.conversation_id,
            role,
            content: self.content,
            timestamp: parse_datetime(&self.timestamp)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Pool- and IO-level failures mean the storage is unavailable; everything
/// else is a query error.
fn map_sqlx(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => StoreError::Unavailable(e.to_string()),
        _ => StoreError::Query(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// ConversationStore implementation
// ---------------------------------------------------------------------------

impl ConversationStore for SqliteConversationStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL
                    REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL CHECK (length(content) >= 1),
                timestamp TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation_id ON messages(conversation_id)",
            "CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp)",
            "CREATE INDEX IF NOT EXISTS idx_conversations_updated_at ON conversations(updated_at)",
        ] {
            sqlx::query(index)
                .execute(&self.pool.writer)
                .await
                .map_err(map_sqlx)?;
        }

        Ok(())
    }

    async fn create_conversation(
        &self,
        owner_id: Option<&str>,
        title: &str,
    ) -> Result<i64, StoreError> {
        let now = format_datetime(&Utc::now());

        let result = sqlx::query(
            r#"INSERT INTO conversations (owner_id, title, created_at, updated_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(owner_id)
        .bind(title)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;

        Ok(result.last_insert_rowid())
    }

    async fn append_message(
        &self,
        conversation_id: i64,
        role: Role,
        content: &str,
    ) -> Result<Message, StoreError> {
        let timestamp = Utc::now();
        let timestamp_text = format_datetime(&timestamp);

        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx)?;

        // Touch the conversation first: zero rows affected means it does
        // not exist, and the transaction rolls back on drop. MAX keeps
        // updated_at monotonic when concurrent appends commit out of
        // timestamp-capture order (RFC 3339 text compares chronologically).
        let touched =
            sqlx::query("UPDATE conversations SET updated_at = MAX(updated_at, ?) WHERE id = ?")
                .bind(&timestamp_text)
                .bind(conversation_id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?;

        if touched.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let inserted = sqlx::query(
            r#"INSERT INTO messages (conversation_id, role, content, timestamp)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(conversation_id)
        .bind(role.to_string())
        .bind(content)
        .bind(&timestamp_text)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;

        Ok(Message {
            id: inserted.last_insert_rowid(),
            conversation_id,
            role,
            content: content.to_string(),
            timestamp,
        })
    }

    async fn get_conversation(
        &self,
        conversation_id: i64,
    ) -> Result<Option<ConversationHistory>, StoreError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let conversation = ConversationRow::from_row(&row)
            .map_err(map_sqlx)?
            .into_conversation()?;

        let rows = sqlx::query(
            r#"SELECT * FROM messages WHERE conversation_id = ?
               ORDER BY timestamp ASC, id ASC"#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            messages.push(MessageRow::from_row(row).map_err(map_sqlx)?.into_message()?);
        }

        Ok(Some(ConversationHistory {
            conversation,
            messages,
        }))
    }

    async fn list_conversations(
        &self,
        limit: i64,
        offset: i64,
        owner_id: Option<&str>,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let mut sql = String::from(
            r#"SELECT c.id, c.owner_id, c.title, c.created_at, c.updated_at,
                      COUNT(m.id) AS message_count
               FROM conversations c
               LEFT JOIN messages m ON m.conversation_id = c.id"#,
        );
        if owner_id.is_some() {
            sql.push_str(" WHERE c.owner_id = ?");
        }
        sql.push_str(" GROUP BY c.id ORDER BY c.updated_at DESC");
        sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));

        let mut query = sqlx::query(&sql);
        if let Some(owner) = owner_id {
            query = query.bind(owner);
        }

        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let conversation = ConversationRow::from_row(row)
                .map_err(map_sqlx)?
                .into_conversation()?;
            let message_count: i64 = row.try_get("message_count").map_err(map_sqlx)?;
            summaries.push(ConversationSummary {
                id: conversation.id,
                owner_id: conversation.owner_id,
                title: conversation.title,
                created_at: conversation.created_at,
                updated_at: conversation.updated_at,
                message_count,
            });
        }

        Ok(summaries)
    }

    async fn delete_conversation(&self, conversation_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    async fn recent_messages(
        &self,
        conversation_id: i64,
        n: i64,
    ) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT * FROM messages WHERE conversation_id = ?
               ORDER BY timestamp DESC, id DESC LIMIT ?"#,
        )
        .bind(conversation_id)
        .bind(n)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            messages.push(MessageRow::from_row(row).map_err(map_sqlx)?.into_message()?);
        }

        // Newest-first from the query; hand back chronological order.
        messages.reverse();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteConversationStore {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        let pool = DatabasePool::new(&url).await.unwrap();
        let store = SqliteConversationStore::new(pool);
        store.ensure_schema().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_ensure_schema_idempotent() {
        let store = test_store().await;
        // Called once by test_store already; repeat calls must not fail.
        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&store.pool.reader)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(table_names, vec!["conversations", "messages"]);
    }

    #[tokio::test]
    async fn test_create_and_get_conversation() {
        let store = test_store().await;

        let id = store
            .create_conversation(Some("alice"), "Rust questions")
            .await
            .unwrap();
        assert!(id > 0);

        let history = store.get_conversation(id).await.unwrap().unwrap();
        assert_eq!(history.conversation.id, id);
        assert_eq!(history.conversation.owner_id.as_deref(), Some("alice"));
        assert_eq!(history.conversation.title, "Rust questions");
        assert_eq!(
            history.conversation.created_at,
            history.conversation.updated_at
        );
        assert!(history.messages.is_empty());
    }

    #[tokio::test]
    async fn test_get_conversation_absent() {
        let store = test_store().await;
        assert!(store.get_conversation(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_roundtrip_and_atomic_touch() {
        let store = test_store().await;
        let id = store.create_conversation(None, "touch").await.unwrap();

        let message = store
            .append_message(id, Role::User, "Hello there")
            .await
            .unwrap();
        assert!(message.id > 0);

        let history = store.get_conversation(id).await.unwrap().unwrap();
        assert_eq!(history.messages.len(), 1);
        assert_eq!(history.messages[0].role, Role::User);
        assert_eq!(history.messages[0].content, "Hello there");
        assert!(history.messages[0].timestamp >= history.conversation.created_at);

        // updated_at was bumped to exactly the message timestamp.
        assert_eq!(history.conversation.updated_at, history.messages[0].timestamp);

        let reply = store
            .append_message(id, Role::Assistant, "General Kenobi")
            .await
            .unwrap();
        let history = store.get_conversation(id).await.unwrap().unwrap();
        assert_eq!(history.conversation.updated_at, reply.timestamp);
        assert!(history.conversation.updated_at >= history.messages[0].timestamp);
    }

    #[tokio::test]
    async fn test_updated_at_never_moves_backwards() {
        let store = test_store().await;
        let id = store.create_conversation(None, "racy").await.unwrap();

        // Stand in for a concurrent append that captured a later timestamp
        // but committed first.
        let ahead = format_datetime(&(Utc::now() + chrono::Duration::seconds(60)));
        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(&ahead)
            .bind(id)
            .execute(&store.pool.writer)
            .await
            .unwrap();

        let message = store.append_message(id, Role::User, "late").await.unwrap();

        let history = store.get_conversation(id).await.unwrap().unwrap();
        assert_eq!(format_datetime(&history.conversation.updated_at), ahead);
        assert!(history.conversation.updated_at >= message.timestamp);
    }

    #[tokio::test]
    async fn test_append_to_missing_conversation_is_not_found() {
        let store = test_store().await;
        let err = store
            .append_message(12345, Role::User, "hello?")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_empty_content_rejected_by_schema() {
        let store = test_store().await;
        let id = store.create_conversation(None, "strict").await.unwrap();

        let err = store.append_message(id, Role::User, "").await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));

        // The failed append must not have touched updated_at either.
        let history = store.get_conversation(id).await.unwrap().unwrap();
        assert_eq!(
            history.conversation.updated_at,
            history.conversation.created_at
        );
        assert!(history.messages.is_empty());
    }

    #[tokio::test]
    async fn test_recent_messages_is_ascending_suffix() {
        let store = test_store().await;
        let id = store.create_conversation(None, "ordering").await.unwrap();

        for i in 1..=5 {
            let role = if i % 2 == 1 { Role::User } else { Role::Assistant };
            store
                .append_message(id, role, &format!("m{i}"))
                .await
                .unwrap();
        }

        let full = store.get_conversation(id).await.unwrap().unwrap().messages;
        assert_eq!(full.len(), 5);

        let recent = store.recent_messages(id, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        for pair in recent.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        // Suffix of the full ascending sequence.
        let recent_ids: Vec<i64> = recent.iter().map(|m| m.id).collect();
        let suffix_ids: Vec<i64> = full[2..].iter().map(|m| m.id).collect();
        assert_eq!(recent_ids, suffix_ids);
    }

    #[tokio::test]
    async fn test_recent_messages_window_larger_than_history() {
        let store = test_store().await;
        let id = store.create_conversation(None, "small").await.unwrap();
        store.append_message(id, Role::User, "only").await.unwrap();

        let recent = store.recent_messages(id, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].content, "only");
    }

    #[tokio::test]
    async fn test_delete_cascades_to_messages() {
        let store = test_store().await;
        let id = store.create_conversation(None, "doomed").await.unwrap();
        store.append_message(id, Role::User, "hi").await.unwrap();
        store
            .append_message(id, Role::Assistant, "hello")
            .await
            .unwrap();

        assert!(store.delete_conversation(id).await.unwrap());
        assert!(store.get_conversation(id).await.unwrap().is_none());
        assert!(store.list_conversations(50, 0, None).await.unwrap().is_empty());

        let orphans: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
                .bind(id)
                .fetch_one(&store.pool.reader)
                .await
                .unwrap();
        assert_eq!(orphans.0, 0);

        // Second delete reports nothing removed.
        assert!(!store.delete_conversation(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_newest_updated_first_with_counts() {
        let store = test_store().await;
        let first = store.create_conversation(None, "first").await.unwrap();
        let second = store.create_conversation(None, "second").await.unwrap();

        store.append_message(second, Role::User, "a").await.unwrap();
        // Touch `first` last so it sorts to the top.
        store.append_message(first, Role::User, "b").await.unwrap();
        store
            .append_message(first, Role::Assistant, "c")
            .await
            .unwrap();

        let summaries = store.list_conversations(50, 0, None).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, first);
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(summaries[1].id, second);
        assert_eq!(summaries[1].message_count, 1);
    }

    #[tokio::test]
    async fn test_list_owner_filter_and_pagination() {
        let store = test_store().await;
        for i in 0..3 {
            store
                .create_conversation(Some("alice"), &format!("a{i}"))
                .await
                .unwrap();
        }
        store.create_conversation(Some("bob"), "b0").await.unwrap();
        store.create_conversation(None, "anon").await.unwrap();

        let alices = store
            .list_conversations(50, 0, Some("alice"))
            .await
            .unwrap();
        assert_eq!(alices.len(), 3);
        assert!(alices.iter().all(|c| c.owner_id.as_deref() == Some("alice")));

        let page = store
            .list_conversations(2, 1, Some("alice"))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);

        let all = store.list_conversations(50, 0, None).await.unwrap();
        assert_eq!(all.len(), 5);
    }
}
