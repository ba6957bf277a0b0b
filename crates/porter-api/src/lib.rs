//! The Porter HTTP API.
//!
//! Thin handlers over the job store, supervisor, and pipelines: every
//! long-running operation returns `202 Accepted` with a ticket, and the
//! ticket's record is polled, downloaded from, or cancelled through the
//! `/api/jobs` routes.

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
