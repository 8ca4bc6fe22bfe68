//! Repository for the `uploaded_images` table.

use sqlx::PgPool;

use crate::models::uploaded_image::UploadedImage;

/// Column list for `uploaded_images` queries.
const COLUMNS: &str = "id, image_name, image_data, created_at";

pub struct UploadedImageRepo;

impl UploadedImageRepo {
    /// Insert an image, returning the full row.
    pub async fn insert(
        pool: &PgPool,
        image_name: &str,
        image_data: &str,
    ) -> Result<UploadedImage, sqlx::Error> {
        let query = format!(
            "INSERT INTO uploaded_images (image_name, image_data) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UploadedImage>(&query)
            .bind(image_name)
            .bind(image_data)
            .fetch_one(pool)
            .await
    }

    /// Most recent image stored under `image_name`.
    pub async fn find_by_name(
        pool: &PgPool,
        image_name: &str,
    ) -> Result<Option<UploadedImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM uploaded_images \
             WHERE image_name = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, UploadedImage>(&query)
            .bind(image_name)
            .fetch_optional(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM uploaded_images")
            .fetch_one(pool)
            .await
    }
}
