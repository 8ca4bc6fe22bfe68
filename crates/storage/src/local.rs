//! Local directory storage.

use std::path::PathBuf;

use async_trait::async_trait;
use recipe_core::backends::ObjectStore;
use recipe_core::protocol::BackendError;

use crate::StorageError;

/// URL prefix under which the API serves the upload directory.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Writes objects into a directory that the API serves statically.
pub struct LocalObjectStore {
    dir: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Write `bytes` to `<dir>/<name>`, creating the directory if needed.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    pub fn public_url(&self, name: &str) -> String {
        format!("{}{UPLOADS_ROUTE}/{name}", self.public_base_url)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_object(
        &self,
        name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, BackendError> {
        let path = self.write(name, &bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Upload stored locally");
        Ok(self.public_url(name))
    }
}
