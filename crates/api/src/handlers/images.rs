//! Stored image lookup.

use axum::extract::{Path, State};
use axum::Json;
use recipe_core::error::CoreError;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StoredImage {
    pub image_name: String,
    /// Base64-encoded image bytes.
    pub image_data: String,
}

/// GET /api/v1/images/{name}
pub async fn get_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<DataResponse<StoredImage>>> {
    let image_data = state
        .records()?
        .fetch(&name)
        .await
        .map_err(|e| AppError::InternalError(format!("Image lookup failed: {e}")))?
        .ok_or_else(|| CoreError::NotFound {
            entity: "Image",
            key: name.clone(),
        })?;

    Ok(Json(DataResponse {
        data: StoredImage {
            image_name: name,
            image_data,
        },
    }))
}
