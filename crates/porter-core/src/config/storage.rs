//! Working-directory configuration.

use serde::{Deserialize, Serialize};

/// Filesystem settings for per-ticket working directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory under which all ticket workdirs are created.
    #[serde(default = "default_data_root")]
    pub data_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
        }
    }
}

fn default_data_root() -> String {
    "./data".to_string()
}
