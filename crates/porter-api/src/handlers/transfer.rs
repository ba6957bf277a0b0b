//! Transfer job creation.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use porter_core::types::{JobKind, Ticket};
use porter_pipeline::{TransferDestination, TransferJob, TransferSource};
use porter_targets::TargetAction;

use crate::dto::TransferRequest;
use crate::error::ApiError;
use crate::extract::{
    DESTINATION_TOKEN_HEADER, SOURCE_TOKEN_HEADER, require_token, transfer_digest,
};
use crate::handlers::start_job;
use crate::handlers::upload::parse_policy;
use crate::state::AppState;

/// `POST /api/transfers`
pub async fn start_transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let source_token = require_token(&headers, SOURCE_TOKEN_HEADER)?;
    let destination_token = require_token(&headers, DESTINATION_TOKEN_HEADER)?;

    let source_adapter = state
        .registry
        .get_for(&request.source_target, TargetAction::Download)?;
    let destination_adapter = state
        .registry
        .get_for(&request.destination_target, TargetAction::Upload)?;
    let duplicate_policy = parse_policy(request.duplicate_policy.as_deref())?;

    let ticket = Ticket::for_transfer(&source_token, &destination_token);
    let digest = transfer_digest(&source_token, &destination_token);
    let store = Arc::clone(&state.store);
    let job_ticket = ticket.clone();

    start_job(&state, ticket, JobKind::Transfer, digest, move |workdir| {
        TransferJob {
            store,
            workdir,
            source: TransferSource {
                adapter: source_adapter,
                token: source_token,
                resource_id: request.source_resource_id,
            },
            destination: TransferDestination {
                adapter: destination_adapter,
                token: destination_token,
                resource_id: request.destination_resource_id,
            },
            duplicate_policy,
            ticket: job_ticket,
        }
        .run()
    })
    .await
}
