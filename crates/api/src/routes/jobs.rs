//! Route definitions for remote-mode jobs.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// ```text
/// POST   /                  -> submit_job
/// GET    /{run_id}          -> get_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(jobs::submit_job))
        .route("/{run_id}", get(jobs::get_job))
}
