//! Health check endpoint.

use axum::Json;
use axum::extract::State;
use serde_json::json;

use crate::state::AppState;

/// `GET /api/health`
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "targets": state.registry.names(),
    }))
}
