//! Unified application error types for Porter.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Every error carries a stable
//! HTTP-facing status code; terminal job records persist the same codes,
//! so clients see one taxonomy whether an error is raised synchronously
//! or folded into a failed job.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Input validation failed (bad duplicate policy, malformed request, etc.).
    Validation,
    /// The supplied target token was rejected.
    Unauthorized,
    /// The target refused the operation for this credential.
    Forbidden,
    /// The requested resource was not found on the target.
    NotFound,
    /// The ticket does not correspond to any known job.
    InvalidTicket,
    /// The request cannot be honored in the job's current state.
    NotAcceptable,
    /// A conflicting job already exists for this ticket.
    Conflict,
    /// The resource existed once but is permanently gone from the target.
    Gone,
    /// The payload shape is structurally wrong; retrying cannot help.
    Structural,
    /// An error surfaced by a target adapter, with a passthrough status code.
    Target,
    /// The job was cancelled by the user.
    Cancelled,
    /// An internal server error occurred.
    Internal,
    /// The job exceeded its server-side deadline.
    Timeout,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A filesystem or archive I/O error occurred.
    Storage,
}

impl ErrorKind {
    /// Default HTTP status code for this kind.
    ///
    /// `Target` errors carry an adapter-supplied code on the [`AppError`]
    /// itself; this default only applies when the adapter gave none.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation | Self::Structural => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound | Self::InvalidTicket => 404,
            Self::NotAcceptable => 406,
            Self::Conflict => 409,
            Self::Gone => 410,
            Self::Cancelled => 499,
            Self::Target => 502,
            Self::Internal | Self::Configuration | Self::Serialization | Self::Storage => 500,
            Self::Timeout => 504,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::Forbidden => write!(f, "FORBIDDEN"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::InvalidTicket => write!(f, "INVALID_TICKET"),
            Self::NotAcceptable => write!(f, "NOT_ACCEPTABLE"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Gone => write!(f, "GONE"),
            Self::Structural => write!(f, "STRUCTURAL"),
            Self::Target => write!(f, "TARGET"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Storage => write!(f, "STORAGE"),
        }
    }
}

/// The unified application error used throughout Porter.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Explicit status code overriding the kind's default (target passthrough).
    pub status_code: Option<u16>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            source: Some(Box::new(source)),
        }
    }

    /// The HTTP-facing status code for this error.
    pub fn status_code(&self) -> u16 {
        self.status_code.unwrap_or_else(|| self.kind.status_code())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an invalid-ticket error.
    pub fn invalid_ticket(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTicket, message)
    }

    /// Create a not-acceptable error.
    pub fn not_acceptable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAcceptable, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a gone error.
    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Gone, message)
    }

    /// Create a structural error.
    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Structural, message)
    }

    /// Create a target error carrying the adapter-supplied status code.
    pub fn target(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            kind: ErrorKind::Target,
            message: message.into(),
            status_code: Some(status_code),
            source: None,
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            status_code: self.status_code,
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
