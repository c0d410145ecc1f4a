//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use parley_core::chat::pipeline::{ChatError, PipelineError};
use parley_types::error::StoreError;

/// Application-level error that maps to HTTP responses.
///
/// Failure bodies follow the `{"success": false, "error": ...}` envelope;
/// chat failures additionally carry the conversation id when one was
/// resolved before the turn fell over.
#[derive(Debug)]
pub enum ApiError {
    /// Requested conversation does not exist.
    NotFound,
    /// Input rejected before any side effect.
    Validation(String),
    /// Completion provider failure.
    Upstream { conversation_id: Option<i64>, message: String },
    /// Storage failure.
    Storage { conversation_id: Option<i64>, message: String },
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::NotFound,
            other => ApiError::Storage {
                conversation_id: None,
                message: other.to_string(),
            },
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        let conversation_id = e.conversation_id;
        match e.source {
            ChatError::Validation(msg) => ApiError::Validation(msg),
            ChatError::Store(StoreError::NotFound) => ApiError::NotFound,
            ChatError::Store(other) => ApiError::Storage {
                conversation_id,
                message: other.to_string(),
            },
            ChatError::Upstream(e) => ApiError::Upstream {
                conversation_id,
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, conversation_id, message) = match self {
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                None,
                "Conversation not found".to_string(),
            ),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, None, msg),
            ApiError::Upstream {
                conversation_id,
                message,
            } => (StatusCode::BAD_GATEWAY, conversation_id, message),
            ApiError::Storage {
                conversation_id,
                message,
            } => (StatusCode::INTERNAL_SERVER_ERROR, conversation_id, message),
        };

        let mut body = json!({
            "success": false,
            "error": message,
        });
        if let Some(id) = conversation_id {
            body["conversationId"] = json!(id);
        }

        (status, axum::Json(body)).into_response()
    }
}
