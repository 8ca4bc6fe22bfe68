//! Multipart photo upload extraction.

use axum::extract::Multipart;
use recipe_core::upload::{content_type_for, validate_image_filename};

use crate::error::{AppError, AppResult};

/// Multipart field carrying the photo.
pub const FILE_FIELD: &str = "file";

/// A validated photo upload.
#[derive(Debug)]
pub struct ImageUpload {
    /// Sanitized filename with a supported image extension.
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Read the `file` field from a multipart body.
///
/// A body without the field is rejected with "No file part"; a field with
/// an empty filename with "No selected file". Other fields are ignored.
pub async fn read_image_upload(mut multipart: Multipart) -> AppResult<ImageUpload> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = validate_image_filename(field.file_name().unwrap_or(""))?;
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".into()));
        }

        tracing::debug!(filename = %filename, size = bytes.len(), "Photo upload received");
        return Ok(ImageUpload {
            content_type: content_type_for(&filename),
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::BadRequest("No file part".into()))
}
