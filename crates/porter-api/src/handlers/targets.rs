//! Target browsing endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;

use porter_core::traits::ResourceSummary;
use porter_targets::TargetAction;

use crate::error::ApiError;
use crate::extract::{TOKEN_HEADER, require_token};
use crate::state::AppState;

/// `GET /api/targets/{target}/resources`
pub async fn list_resources(
    State(state): State<AppState>,
    Path(target): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<ResourceSummary>>, ApiError> {
    let token = require_token(&headers, TOKEN_HEADER)?;
    let adapter = state.registry.get_for(&target, TargetAction::Download)?;
    Ok(Json(adapter.fetch_resources(&token).await?))
}

/// `GET /api/targets/{target}/resources/{resource_id}`
pub async fn get_resource(
    State(state): State<AppState>,
    Path((target, resource_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<ResourceSummary>, ApiError> {
    let token = require_token(&headers, TOKEN_HEADER)?;
    let adapter = state.registry.get_for(&target, TargetAction::Download)?;
    Ok(Json(adapter.fetch_resource(&token, &resource_id).await?))
}
