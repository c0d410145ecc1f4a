//! Health check handler.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde_json::{Value, json};

use parley_core::chat::pipeline::ComponentStatus;

use crate::state::AppState;

/// GET /api/health - Probe storage and the completion provider.
///
/// Always 200; component failures are reported in the body rather than
/// through the status code.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let status = state.pipeline.health_check().await;

    let overall = if status.storage == ComponentStatus::Ok
        && status.completion_api == ComponentStatus::Ok
    {
        "ok"
    } else {
        "degraded"
    };

    Json(json!({
        "status": overall,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "storage": status.storage,
        "completionApi": status.completion_api,
    }))
}
