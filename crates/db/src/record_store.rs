//! [`RecordStore`] backed by Postgres.

use async_trait::async_trait;
use recipe_core::backends::RecordStore;
use recipe_core::protocol::BackendError;

use crate::repositories::UploadedImageRepo;
use crate::DbPool;

pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, name: &str, base64_blob: &str) -> Result<(), BackendError> {
        let row = UploadedImageRepo::insert(&self.pool, name, base64_blob).await?;
        tracing::debug!(id = row.id, image_name = name, "Image record inserted");
        Ok(())
    }

    async fn fetch(&self, name: &str) -> Result<Option<String>, BackendError> {
        Ok(UploadedImageRepo::find_by_name(&self.pool, name)
            .await?
            .map(|row| row.image_data))
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}
