//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, get};

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_reports_mode_and_version() {
    let harness = common::build_remote_app(common::ScriptedJobs::default());
    let response = get(harness.app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["execution_mode"], "remote");
    assert!(json["version"].is_string());
    // No record store configured in remote test mode.
    assert!(json.get("records_healthy").is_none());
}

#[tokio::test]
async fn health_check_includes_record_store_in_local_mode() {
    let harness = common::build_local_app("Soup", Duration::ZERO);
    let json = body_json(get(harness.app, "/health").await).await;

    assert_eq!(json["execution_mode"], "local");
    assert_eq!(json["records_healthy"], true);
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let harness = common::build_remote_app(common::ScriptedJobs::default());
    let response = get(harness.app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let harness = common::build_remote_app(common::ScriptedJobs::default());
    let response = get(harness.app, "/health").await;

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );
    assert_eq!(request_id.unwrap().to_str().unwrap().len(), 36);
}
