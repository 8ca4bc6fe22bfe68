//! Uploaded image entity model.

use recipe_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `uploaded_images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UploadedImage {
    pub id: i64,
    pub image_name: String,
    /// Base64-encoded image bytes.
    pub image_data: String,
    pub created_at: Timestamp,
}
