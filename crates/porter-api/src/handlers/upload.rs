//! Upload job creation.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use bytes::Bytes;

use porter_core::error::AppError;
use porter_core::traits::DuplicatePolicy;
use porter_core::types::{JobKind, Ticket, token_digest};
use porter_pipeline::UploadJob;
use porter_targets::TargetAction;

use crate::dto::UploadParams;
use crate::error::ApiError;
use crate::extract::{TOKEN_HEADER, require_token};
use crate::handlers::start_job;
use crate::state::AppState;

/// `POST /api/targets/{target}/upload`
///
/// Multipart body with one `file` part holding the zipped bag. The whole
/// archive is buffered before the job is accepted: a client that
/// disconnects mid-upload never creates a job.
pub async fn start_upload(
    State(state): State<AppState>,
    Path(target): Path<String>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let token = require_token(&headers, TOKEN_HEADER)?;
    let adapter = state.registry.get_for(&target, TargetAction::Upload)?;
    let duplicate_policy = parse_policy(params.duplicate_policy.as_deref())?;
    let zip_bytes = read_bag_part(multipart).await?;

    let ticket = Ticket::for_upload(&token);
    let digest = token_digest(&token);
    let store = Arc::clone(&state.store);
    let job_ticket = ticket.clone();
    let resource_id = params.resource_id;

    start_job(&state, ticket, JobKind::Upload, digest, move |workdir| {
        UploadJob {
            store,
            workdir,
            adapter,
            token,
            resource_id,
            zip_bytes,
            duplicate_policy,
            ticket: job_ticket,
        }
        .run()
    })
    .await
}

pub(crate) fn parse_policy(raw: Option<&str>) -> Result<DuplicatePolicy, ApiError> {
    Ok(match raw {
        Some(raw) => raw.parse()?,
        None => DuplicatePolicy::Ignore,
    })
}

/// Pull the zipped bag out of the multipart body.
async fn read_bag_part(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {e}")))?
    {
        if matches!(field.name(), Some("file") | Some("bag")) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(format!("Failed to read the bag archive: {e}")))?;
            if bytes.is_empty() {
                return Err(AppError::validation("The bag archive is empty").into());
            }
            return Ok(bytes);
        }
    }
    Err(AppError::validation("The request is missing the bag archive").into())
}
