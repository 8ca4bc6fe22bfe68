pub mod health;
pub mod images;
pub mod jobs;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /jobs                   remote-mode jobs (submit, poll)
/// /tasks                  local-mode tasks (submit, poll)
/// /images                 stored image lookup
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", jobs::router())
        .nest("/tasks", tasks::router())
        .nest("/images", images::router())
}
