pub mod images;
pub mod jobs;
pub mod tasks;

use axum::http::{header, HeaderMap, HeaderValue};

/// `Retry-After` header telling pollers when to come back.
pub(crate) fn retry_after(secs: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
    headers
}
