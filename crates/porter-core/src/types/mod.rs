//! Domain types shared across Porter crates.

pub mod fixity;
pub mod job;
pub mod ticket;

pub use fixity::{FixityResult, HashAlgorithm};
pub use job::{JobKind, JobRecord, JobStatus, PhaseRecord};
pub use ticket::{Ticket, token_digest};
