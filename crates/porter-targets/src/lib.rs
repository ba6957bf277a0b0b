//! Target registration and the in-tree reference adapter.

pub mod localdir;
pub mod registry;

pub use localdir::LocalDirAdapter;
pub use registry::{TargetAction, TargetCapabilities, TargetRegistry};
