//! S3 storage with presigned download URLs.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use recipe_core::backends::ObjectStore;
use recipe_core::protocol::BackendError;

use crate::StorageError;

/// Default lifetime of a presigned download URL.
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(3600);

/// Stores uploads in an S3 bucket.
///
/// The returned URL is presigned so the remote job can fetch the photo
/// without bucket credentials of its own.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    presign_expiry: Duration,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, presign_expiry: Duration) -> Self {
        Self {
            client,
            bucket,
            presign_expiry,
        }
    }

    /// Build a client from the standard AWS environment (region, credentials).
    pub async fn from_env(bucket: String, presign_expiry: Duration) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket, presign_expiry)
    }

    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::S3(DisplayErrorContext(e).to_string()))?;

        let presigning = PresigningConfig::expires_in(self.presign_expiry)
            .map_err(|e| StorageError::S3(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::S3(DisplayErrorContext(e).to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        let size = bytes.len();
        let url = self.upload(name, bytes, content_type).await?;
        tracing::info!(bucket = %self.bucket, key = name, size, "Upload stored in S3");
        Ok(url)
    }
}
