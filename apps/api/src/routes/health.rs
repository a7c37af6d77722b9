use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version and the number of open preview sessions.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "cv-preview-api",
        "sessions": state.sessions.len(),
        "manual_overrides_enabled": state.orchestrator.manual_overrides_enabled
    }))
}
