//! Handlers for remote-mode recipe jobs.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use recipe_core::protocol::CheckOutcome;
use recipe_core::types::{InputRef, JobHandle};
use recipe_storage::naming::object_name;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::retry_after;
use crate::presentation::JobView;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::upload::read_image_upload;

/// Response body for an accepted job.
#[derive(Debug, Serialize)]
pub struct SubmittedJob {
    pub run_id: JobHandle,
    /// Where to poll for the result.
    pub status_url: String,
}

/// POST /api/v1/jobs
///
/// Store the uploaded photo and start one remote job run for it.
pub async fn submit_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<SubmittedJob>>)> {
    let jobs = state.remote_jobs()?;
    let upload = read_image_upload(multipart).await?;

    let name = object_name(&upload.filename, &upload.bytes);
    let url = state
        .objects
        .put_object(&name, upload.bytes, upload.content_type)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store upload: {e}")))?;

    let run_id = jobs.submit(&InputRef::Url(url)).await?;
    tracing::info!(run_id = %run_id, object = %name, "Recipe job started");

    let status_url = format!("/api/v1/jobs/{run_id}");
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmittedJob { run_id, status_url },
        }),
    ))
}

/// GET /api/v1/jobs/{run_id}
///
/// `202` with `Retry-After` while the run is in progress, `200` once it has
/// a result.
pub async fn get_job(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> AppResult<Response> {
    let handle = JobHandle::new(run_id);
    let outcome = state.remote_jobs()?.check(&handle).await?;

    Ok(match outcome {
        CheckOutcome::Running(status) => (
            StatusCode::ACCEPTED,
            retry_after(state.config.poll_retry_after_secs),
            Json(DataResponse {
                data: JobView::in_progress(&status),
            }),
        )
            .into_response(),
        CheckOutcome::Done(result) => {
            tracing::info!(
                run_id = %handle,
                success = result.is_success(),
                "Recipe job result delivered",
            );
            Json(DataResponse {
                data: JobView::finished(&result),
            })
            .into_response()
        }
    })
}
