//! Trait definitions implemented by other Porter crates.

pub mod target;

pub use target::{
    DownloadPayload, DownloadedResource, DuplicatePolicy, ResourceSummary, TargetAdapter,
    UploadOutcome,
};
