//! The three job pipelines: download, upload, and transfer.
//!
//! Each pipeline is an async work function handed to the worker
//! supervisor. Pipelines publish progress into the job record as they go
//! and return a [`porter_jobs::JobOutcome`] on success; every error path
//! propagates an `AppError` whose status code the supervisor persists on
//! the failed record.

pub mod download;
pub mod message;
pub mod metadata;
pub mod transfer;
pub mod upload;
pub mod workdir;

pub use download::DownloadJob;
pub use transfer::{TransferDestination, TransferJob, TransferSource};
pub use upload::UploadJob;
pub use workdir::{Workdir, Workdirs};
