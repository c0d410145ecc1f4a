//! Application state wiring the pipeline to its concrete backends.
//!
//! The pipeline is generic over store/client traits, but AppState pins it
//! to the SQLite store and the OpenAI-compatible HTTP client.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use parley_core::chat::pipeline::ChatPipeline;
use parley_core::chat::store::ConversationStore;
use parley_infra::llm::openai_compat::OpenAiCompatClient;
use parley_infra::sqlite::conversation::SqliteConversationStore;
use parley_infra::sqlite::pool::DatabasePool;

/// Concrete pipeline type pinned to the infra implementations.
pub type ConcretePipeline = ChatPipeline<SqliteConversationStore, OpenAiCompatClient>;

/// Shared application state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ConcretePipeline>,
}

impl AppState {
    /// Initialize the application state: open the database, ensure the
    /// schema exists, and wire the completion client into the pipeline.
    pub async fn init(
        database: &Path,
        api_key: SecretString,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", database.display());
        let pool = DatabasePool::new(&db_url).await?;

        let store = SqliteConversationStore::new(pool);
        store.ensure_schema().await?;

        let client = OpenAiCompatClient::new(api_key, timeout)?
            .with_base_url(base_url)
            .with_model(model);

        Ok(Self {
            pipeline: Arc::new(ChatPipeline::new(store, client)),
        })
    }
}
