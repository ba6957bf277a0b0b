//! Target registration configuration.

use serde::{Deserialize, Serialize};

/// One registered target in the capability table.
///
/// Targets are registered explicitly at startup from this list; there is
/// no directory scanning or lazy discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDefinition {
    /// Unique target name used in request paths (e.g. `"localdir"`).
    pub name: String,
    /// Adapter kind. Currently only `"localdir"` ships in-tree.
    pub kind: String,
    /// Adapter-specific root path (localdir).
    #[serde(default)]
    pub root: String,
    /// Whether the target's storage hierarchy supports arbitrarily deep trees.
    #[serde(default = "default_true")]
    pub nested_hierarchy: bool,
    /// Whether downloads from this target are allowed.
    #[serde(default = "default_true")]
    pub allow_download: bool,
    /// Whether uploads to this target are allowed.
    #[serde(default = "default_true")]
    pub allow_upload: bool,
}

fn default_true() -> bool {
    true
}
