//! Static target capability table.
//!
//! Every target adapter registers itself once at program start; the table
//! never changes afterwards and there is no lazy discovery or directory
//! scanning. An action a target was not registered for is reported as an
//! explicit unsupported-action error at call time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use porter_core::error::AppError;
use porter_core::result::AppResult;
use porter_core::traits::TargetAdapter;

/// Actions a target can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAction {
    /// Serving downloads.
    Download,
    /// Accepting uploads.
    Upload,
}

impl fmt::Display for TargetAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Upload => write!(f, "upload"),
        }
    }
}

/// What a registered target is allowed to do.
#[derive(Debug, Clone, Copy)]
pub struct TargetCapabilities {
    /// Whether downloads from this target are allowed.
    pub download: bool,
    /// Whether uploads to this target are allowed.
    pub upload: bool,
}

#[derive(Debug)]
struct TargetEntry {
    adapter: Arc<dyn TargetAdapter>,
    capabilities: TargetCapabilities,
}

/// Map from target name to its adapter and capabilities.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    entries: HashMap<String, TargetEntry>,
}

impl TargetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register an adapter under its own name.
    pub fn register(&mut self, adapter: Arc<dyn TargetAdapter>, capabilities: TargetCapabilities) {
        let name = adapter.name().to_string();
        tracing::info!(
            target_name = %name,
            download = capabilities.download,
            upload = capabilities.upload,
            "Registered target"
        );
        self.entries.insert(
            name,
            TargetEntry {
                adapter,
                capabilities,
            },
        );
    }

    /// Resolve a target for an action.
    ///
    /// Unknown targets are 404; known targets missing the capability are
    /// an explicit unsupported-action validation error.
    pub fn get_for(&self, name: &str, action: TargetAction) -> AppResult<Arc<dyn TargetAdapter>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| AppError::not_found(format!("'{name}' is not a registered target")))?;

        let allowed = match action {
            TargetAction::Download => entry.capabilities.download,
            TargetAction::Upload => entry.capabilities.upload,
        };
        if !allowed {
            return Err(AppError::validation(format!(
                "Target '{name}' does not support the action '{action}'"
            )));
        }
        Ok(Arc::clone(&entry.adapter))
    }

    /// Names of all registered targets.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localdir::LocalDirAdapter;

    fn registry_with(download: bool, upload: bool) -> TargetRegistry {
        let tmp = std::env::temp_dir().join("porter-registry-test");
        let adapter = Arc::new(LocalDirAdapter::new("demo", &tmp, true));
        let mut registry = TargetRegistry::new();
        registry.register(adapter, TargetCapabilities { download, upload });
        registry
    }

    #[test]
    fn test_unknown_target_is_not_found() {
        let registry = TargetRegistry::new();
        let err = registry
            .get_for("osf", TargetAction::Download)
            .expect_err("must fail");
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_missing_capability_is_unsupported_action() {
        let registry = registry_with(true, false);
        registry
            .get_for("demo", TargetAction::Download)
            .expect("download allowed");
        let err = registry
            .get_for("demo", TargetAction::Upload)
            .expect_err("upload not allowed");
        assert_eq!(err.status_code(), 400);
        assert!(err.message.contains("does not support"));
    }
}
