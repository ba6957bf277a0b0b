//! Download job creation.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use porter_core::types::{JobKind, Ticket, token_digest};
use porter_pipeline::DownloadJob;
use porter_targets::TargetAction;

use crate::error::ApiError;
use crate::extract::{TOKEN_HEADER, require_token};
use crate::handlers::start_job;
use crate::state::AppState;

/// `POST /api/targets/{target}/resources/{resource_id}/download`
pub async fn start_download(
    State(state): State<AppState>,
    Path((target, resource_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = require_token(&headers, TOKEN_HEADER)?;
    // Capability failures surface synchronously, before a record exists.
    let adapter = state.registry.get_for(&target, TargetAction::Download)?;

    let ticket = Ticket::for_download(&token);
    let digest = token_digest(&token);
    let store = Arc::clone(&state.store);
    let job_ticket = ticket.clone();

    start_job(&state, ticket, JobKind::Download, digest, move |workdir| {
        DownloadJob {
            store,
            workdir,
            adapter,
            token,
            resource_id,
            ticket: job_ticket,
        }
        .run()
    })
    .await
}
