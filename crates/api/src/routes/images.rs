use axum::routing::get;
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// ```text
/// GET    /{name}            -> get_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{name}", get(images::get_image))
}
