//! Credential header extraction.
//!
//! Target tokens arrive in dedicated headers, never in URLs or bodies, so
//! they stay out of access logs. Downloads and uploads use one token;
//! transfers carry one per side.

use axum::http::HeaderMap;

use porter_core::error::AppError;
use porter_core::types::token_digest;

use crate::error::ApiError;

/// Token for the single target of a download or upload.
pub const TOKEN_HEADER: &str = "porter-token";
/// Token for the source side of a transfer.
pub const SOURCE_TOKEN_HEADER: &str = "porter-source-token";
/// Token for the destination side of a transfer.
pub const DESTINATION_TOKEN_HEADER: &str = "porter-destination-token";

/// Read a required token header.
pub fn require_token(headers: &HeaderMap, name: &str) -> Result<String, ApiError> {
    let value = headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();
    if value.is_empty() {
        return Err(AppError::unauthorized(format!("Missing '{name}' header")).into());
    }
    Ok(value.to_string())
}

/// Digest persisted on a transfer record and compared on every poll.
pub fn transfer_digest(source_token: &str, destination_token: &str) -> String {
    token_digest(&format!("{source_token}:{destination_token}"))
}
