//! Job orchestration: the ticket-keyed record store, the worker
//! supervisor, and the watchdog that enforces the server-side deadline.

pub mod store;
pub mod supervisor;
pub mod watchdog;

pub use store::JobStore;
pub use supervisor::{JobOutcome, WorkerSupervisor};
