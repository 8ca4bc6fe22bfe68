//! Handlers for local-mode recipe tasks.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use recipe_core::error::CoreError;
use recipe_core::job::JobStatus;
use recipe_worker::TaskPoll;
use serde::Serialize;

use crate::error::AppResult;
use crate::handlers::retry_after;
use crate::presentation::JobView;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::upload::read_image_upload;

/// Response body for an accepted task.
#[derive(Debug, Serialize)]
pub struct SubmittedTask {
    /// The sanitized filename; also the polling key.
    pub key: String,
    pub status_url: String,
    /// Public URL of the stored photo, if storing it succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// POST /api/v1/tasks
///
/// Register the photo under its filename and start inference. A filename
/// that is already registered is rejected with 409.
pub async fn submit_task(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<SubmittedTask>>)> {
    let tasks = state.tasks()?;
    let upload = read_image_upload(multipart).await?;
    let key = upload.filename;

    tasks
        .submit(&key, STANDARD.encode(&upload.bytes), upload.content_type)
        .await?;

    // The photo is only kept for display; inference already has its copy.
    let image_url = match state
        .objects
        .put_object(&key, upload.bytes, upload.content_type)
        .await
    {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(task_key = %key, error = %e, "Failed to store uploaded photo");
            None
        }
    };

    let status_url = format!("/api/v1/tasks/{key}");
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmittedTask {
                key,
                status_url,
                image_url,
            },
        }),
    ))
}

/// GET /api/v1/tasks/{key}
pub async fn get_task(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Response> {
    match state.tasks()?.poll_and_maybe_advance(&key).await {
        TaskPoll::Pending => Ok((
            StatusCode::ACCEPTED,
            retry_after(state.config.poll_retry_after_secs),
            Json(DataResponse {
                data: JobView::in_progress(&JobStatus::Running),
            }),
        )
            .into_response()),
        TaskPoll::Done(result) => Ok(Json(DataResponse {
            data: JobView::finished(&result),
        })
        .into_response()),
        TaskPoll::NotFound => Err(CoreError::NotFound {
            entity: "Task",
            key,
        }
        .into()),
    }
}
