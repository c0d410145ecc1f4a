//! Conversation read/delete HTTP handlers.
//!
//! Endpoints:
//! - GET    /api/history/{id} - Full message history for a conversation
//! - GET    /api/chats        - List conversation summaries
//! - DELETE /api/chat/{id}    - Delete a conversation and its messages

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use parley_types::chat::{ConversationHistory, ConversationSummary};

use crate::http::error::ApiError;
use crate::state::AppState;

/// Query parameters for conversation listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub owner_id: Option<String>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    #[serde(flatten)]
    pub conversation: ConversationHistory,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub conversations: Vec<ConversationSummary>,
    pub total: usize,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// GET /api/history/{id} - Conversation metadata plus all messages,
/// oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let conversation = state
        .pipeline
        .get_history(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(HistoryResponse {
        conversation,
        success: true,
    }))
}

/// GET /api/chats - Conversation summaries, newest-updated first.
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let conversations = state
        .pipeline
        .list_conversations(query.limit, query.offset, query.owner_id.as_deref())
        .await?;

    Ok(Json(ListResponse {
        total: conversations.len(),
        conversations,
        success: true,
    }))
}

/// DELETE /api/chat/{id} - Remove a conversation; 404 if it never existed.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.pipeline.delete_conversation(id).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    Ok(Json(DeleteResponse { success: true }))
}
