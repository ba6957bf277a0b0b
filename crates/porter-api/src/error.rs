//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use porter_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Response-side wrapper around [`AppError`].
///
/// Handlers return `Result<_, ApiError>` so `?` works on any `AppResult`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        if matches!(
            err.kind,
            ErrorKind::Internal | ErrorKind::Storage | ErrorKind::Serialization
        ) {
            tracing::error!(kind = %err.kind, "Internal server error: {}", err.message);
        }

        // 499 and other nonstandard codes are valid status codes even
        // though StatusCode has no named constant for them.
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ApiErrorResponse {
            error: err.kind.to_string(),
            message: err.message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_passthrough_status() {
        let response = ApiError(AppError::target("Token is invalid", 401)).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_cancelled_maps_to_499() {
        let response = ApiError(AppError::cancelled("stopped")).into_response();
        assert_eq!(response.status().as_u16(), 499);
    }

    #[test]
    fn test_invalid_ticket_maps_to_404() {
        let response = ApiError(AppError::invalid_ticket("no such job")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
