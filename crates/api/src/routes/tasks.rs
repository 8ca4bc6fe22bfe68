//! Route definitions for local-mode tasks.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// ```text
/// POST   /                  -> submit_task
/// GET    /{key}             -> get_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(tasks::submit_task))
        .route("/{key}", get(tasks::get_task))
}
