use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use recipe_core::error::{CoreError, JobError};
use serde_json::json;

/// User-facing text for job output we could not decode.
pub const MALFORMED_OUTPUT_MESSAGE: &str = "Could not read job output";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`JobError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `recipe_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A job protocol error.
    #[error(transparent)]
    Job(#[from] JobError),

    /// The multipart body could not be read (includes the size limit).
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The endpoint exists but the backing service is not configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, key } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} '{key}' not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Internal(msg) => internal(msg),
            },

            // --- Job protocol ---
            AppError::Job(err) => classify_job_error(err),

            // --- HTTP-specific errors ---
            AppError::Multipart(err) => (err.status(), "INVALID_UPLOAD", err.body_text()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg.clone(),
            ),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal(msg: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a [`JobError`] into an HTTP status, error code, and message.
///
/// - Malformed output maps to 502 with a generic message.
/// - Backend transport failures map to 502; details are logged only.
/// - Handles the backend cannot parse map to 404.
/// - Duplicate task keys map to 409.
/// - A job-reported failure keeps its message.
fn classify_job_error(err: &JobError) -> (StatusCode, &'static str, String) {
    match err {
        JobError::Parse(_) | JobError::Extract(_) => {
            tracing::warn!(error = %err, "Malformed job output");
            (
                StatusCode::BAD_GATEWAY,
                "MALFORMED_JOB_OUTPUT",
                MALFORMED_OUTPUT_MESSAGE.to_string(),
            )
        }
        JobError::Submission(detail) => {
            tracing::error!(error = %detail, "Job submission failed");
            (
                StatusCode::BAD_GATEWAY,
                "JOB_SUBMISSION_FAILED",
                "Could not start the recipe job".to_string(),
            )
        }
        JobError::Poll(detail) | JobError::Fetch(detail) => {
            tracing::error!(error = %detail, "Job backend request failed");
            (
                StatusCode::BAD_GATEWAY,
                "JOB_BACKEND_ERROR",
                "Could not reach the job backend".to_string(),
            )
        }
        JobError::UnknownHandle(handle) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Job '{handle}' not found"),
        ),
        JobError::DuplicateKey(_) => (StatusCode::CONFLICT, "CONFLICT", err.to_string()),
        JobError::BackendFailure(msg) => (StatusCode::BAD_GATEWAY, "JOB_FAILED", msg.clone()),
        JobError::Cancelled => (
            StatusCode::SERVICE_UNAVAILABLE,
            "CANCELLED",
            err.to_string(),
        ),
        JobError::DeadlineExceeded => {
            (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED", err.to_string())
        }
    }
}
