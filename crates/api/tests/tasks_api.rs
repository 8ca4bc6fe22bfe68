//! Integration tests for local-mode task submission and polling.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, get, upload};
use serde_json::Value;

/// Poll a task until it stops answering 202.
async fn poll_until_done(app: &Router, key: &str) -> (StatusCode, Value) {
    for _ in 0..200 {
        let response = get(app.clone(), &format!("/api/v1/tasks/{key}")).await;
        if response.status() != StatusCode::ACCEPTED {
            let status = response.status();
            return (status, body_json(response).await);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {key} never finished");
}

// ---------------------------------------------------------------------------
// Test: submit, poll pending, then done
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submitted_task_completes_with_recipe() {
    let harness = common::build_local_app("Banana bread", Duration::from_millis(50));

    let response = upload(harness.app.clone(), "/api/v1/tasks", "bananas.jpg", b"jpeg").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["key"], "bananas.jpg");
    assert_eq!(json["data"]["status_url"], "/api/v1/tasks/bananas.jpg");
    assert_eq!(json["data"]["image_url"], "https://blob.test/bananas.jpg");

    let pending = get(harness.app.clone(), "/api/v1/tasks/bananas.jpg").await;
    assert_eq!(pending.status(), StatusCode::ACCEPTED);

    let (status, json) = poll_until_done(&harness.app, "bananas.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "succeeded");
    assert_eq!(json["data"]["text"], "Banana bread");
}

// ---------------------------------------------------------------------------
// Test: the same filename cannot be submitted twice
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_filename_returns_409() {
    let harness = common::build_local_app("Soup", Duration::from_millis(200));

    let first = upload(harness.app.clone(), "/api/v1/tasks", "soup.jpg", b"one").await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = upload(harness.app.clone(), "/api/v1/tasks", "soup.jpg", b"two").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(harness.registry.len().await, 1);
}

// ---------------------------------------------------------------------------
// Test: unknown keys return 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_task_returns_404() {
    let harness = common::build_local_app("Soup", Duration::ZERO);

    let response = get(harness.app, "/api/v1/tasks/nothing.jpg").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Test: a completed task is persisted once and served from the record store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completed_task_is_persisted_once_and_retrievable() {
    let harness = common::build_local_app("Pizza", Duration::ZERO);

    upload(harness.app.clone(), "/api/v1/tasks", "pizza.jpg", b"ABC").await;
    poll_until_done(&harness.app, "pizza.jpg").await;
    poll_until_done(&harness.app, "pizza.jpg").await;
    poll_until_done(&harness.app, "pizza.jpg").await;

    // The insert runs on the worker pool; wait for it to land.
    for _ in 0..100 {
        if harness.records.insert_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(harness.records.insert_count(), 1);

    let response = get(harness.app, "/api/v1/images/pizza.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["image_name"], "pizza.jpg");
    // base64("ABC")
    assert_eq!(json["data"]["image_data"], "QUJD");
}

#[tokio::test]
async fn missing_image_returns_404() {
    let harness = common::build_local_app("Soup", Duration::ZERO);

    let response = get(harness.app, "/api/v1/images/absent.jpg").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: unsafe filenames are sanitized into the task key
// ---------------------------------------------------------------------------

#[tokio::test]
async fn path_components_are_stripped_from_key() {
    let harness = common::build_local_app("Soup", Duration::ZERO);

    let response = upload(harness.app, "/api/v1/tasks", "../../etc/lunch.png", b"png").await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let key = body_json(response).await["data"]["key"].clone();
    assert!(!key.as_str().unwrap().contains('/'));
    assert!(key.as_str().unwrap().ends_with("lunch.png"));
}

// ---------------------------------------------------------------------------
// Test: the upload's image type reaches the vision backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn png_upload_is_sent_with_png_content_type() {
    let harness = common::build_local_app("Salad", Duration::ZERO);

    let response = upload(harness.app.clone(), "/api/v1/tasks", "salad.png", b"png").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    poll_until_done(&harness.app, "salad.png").await;

    let seen = harness.vision.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with("data:image/png;base64,"), "{}", seen[0]);
}
