//! Collaborator seams for the services the relay delegates to.
//!
//! Production implementations live in `recipe-storage`, `recipe-vision`,
//! `recipe-db` and `recipe-databricks`; tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::protocol::BackendError;
use crate::types::InputRef;

/// Blob storage for uploaded photos.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `name` and return a URL the inference step can
    /// fetch on its own. The URL may embed a time-limited access token.
    async fn put_object(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError>;
}

/// Vision-capable chat completion model.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Ask the model about `image` and return the raw completion JSON
    /// (`{"choices": [{"message": {"content": ...}}]}`).
    async fn complete(
        &self,
        prompt: &str,
        image: &InputRef,
    ) -> Result<serde_json::Value, BackendError>;
}

/// Durable audit/cache store for processed images.
///
/// Writes happen off the success path; a failed insert never changes what
/// the user sees.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, name: &str, base64_blob: &str) -> Result<(), BackendError>;

    /// Look up a previously inserted blob.
    async fn fetch(&self, name: &str) -> Result<Option<String>, BackendError>;

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
