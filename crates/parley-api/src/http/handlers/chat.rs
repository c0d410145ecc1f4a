//! Chat turn handler.
//!
//! POST /api/chat - Relay a user message through the pipeline and return
//! the assistant's reply.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use parley_types::chat::Message;

use crate::http::error::ApiError;
use crate::state::AppState;

/// Request body for a chat turn.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    /// Absent means "start a new conversation".
    #[serde(default)]
    pub conversation_id: Option<i64>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

fn default_temperature() -> f64 {
    0.7
}

/// Response body for a successful chat turn. `message` is the persisted
/// assistant message, not just its text.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub conversation_id: i64,
    pub message: Message,
    pub success: bool,
}

/// POST /api/chat - Process one chat turn.
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let reply = state
        .pipeline
        .process_message(
            &req.message,
            req.conversation_id,
            req.temperature,
            req.system_prompt.as_deref(),
            req.owner_id.as_deref(),
        )
        .await?;

    Ok(Json(ChatResponse {
        conversation_id: reply.conversation_id,
        message: reply.message,
        success: true,
    }))
}
