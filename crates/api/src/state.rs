use std::sync::Arc;

use recipe_core::backends::{ObjectStore, RecordStore};
use recipe_core::protocol::RemoteJobs;
use recipe_worker::TaskRegistry;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). Exactly one of
/// `remote_jobs` and `tasks` is set, depending on the execution mode.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Remote-mode job protocol.
    pub remote_jobs: Option<Arc<RemoteJobs>>,
    /// Local-mode task registry.
    pub tasks: Option<Arc<TaskRegistry>>,
    /// Where uploaded photos are stored.
    pub objects: Arc<dyn ObjectStore>,
    /// Durable image records, when a database is configured.
    pub records: Option<Arc<dyn RecordStore>>,
}

impl AppState {
    pub fn remote_jobs(&self) -> AppResult<&RemoteJobs> {
        self.remote_jobs.as_deref().ok_or_else(|| {
            AppError::ServiceUnavailable("Remote job execution is not enabled".into())
        })
    }

    pub fn tasks(&self) -> AppResult<&TaskRegistry> {
        self.tasks.as_deref().ok_or_else(|| {
            AppError::ServiceUnavailable("Local task execution is not enabled".into())
        })
    }

    pub fn records(&self) -> AppResult<&dyn RecordStore> {
        self.records
            .as_deref()
            .ok_or_else(|| AppError::ServiceUnavailable("No image record store configured".into()))
    }
}
