//! Application state shared across all handlers.

use std::sync::Arc;

use porter_core::config::AppConfig;
use porter_core::error::AppError;
use porter_core::result::AppResult;
use porter_jobs::{JobStore, WorkerSupervisor};
use porter_pipeline::Workdirs;
use porter_targets::{LocalDirAdapter, TargetCapabilities, TargetRegistry};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Ticket-keyed job record store.
    pub store: Arc<JobStore>,
    /// Worker and watchdog supervisor.
    pub supervisor: Arc<WorkerSupervisor>,
    /// Static target capability table.
    pub registry: Arc<TargetRegistry>,
    /// Per-ticket working directory factory.
    pub workdirs: Workdirs,
}

impl AppState {
    /// Build the full state from configuration, registering every
    /// configured target.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let store = Arc::new(JobStore::new());
        let supervisor = Arc::new(WorkerSupervisor::new(
            Arc::clone(&store),
            config.jobs.clone(),
        ));
        let registry = Arc::new(build_registry(&config)?);
        let workdirs = Workdirs::new(config.storage.data_root.clone());

        Ok(Self {
            config: Arc::new(config),
            store,
            supervisor,
            registry,
            workdirs,
        })
    }
}

/// Construct the capability table from the configured target definitions.
fn build_registry(config: &AppConfig) -> AppResult<TargetRegistry> {
    let mut registry = TargetRegistry::new();
    for definition in &config.targets {
        match definition.kind.as_str() {
            "localdir" => {
                let adapter = LocalDirAdapter::new(
                    definition.name.clone(),
                    std::path::Path::new(&definition.root),
                    definition.nested_hierarchy,
                );
                registry.register(
                    Arc::new(adapter),
                    TargetCapabilities {
                        download: definition.allow_download,
                        upload: definition.allow_upload,
                    },
                );
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown target kind '{other}' for target '{}'",
                    definition.name
                )));
            }
        }
    }
    Ok(registry)
}
