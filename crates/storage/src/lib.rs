//! Object storage for uploaded photos.
//!
//! Two backends implement [`recipe_core::backends::ObjectStore`]: a local
//! directory served by the API under `/uploads`, and an S3 bucket handing
//! out presigned download URLs.

pub mod local;
pub mod naming;
pub mod s3;

use recipe_core::error::CoreError;

/// Errors from a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),
}

/// Configured storage backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackendType {
    Local,
    S3,
}

impl StorageBackendType {
    /// Parse from the `STORAGE_BACKEND` setting.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            other => Err(CoreError::Validation(format!(
                "Unknown storage backend '{other}'. Must be one of: local, s3"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn backend_names_round_trip() {
        for kind in [StorageBackendType::Local, StorageBackendType::S3] {
            assert_eq!(StorageBackendType::from_name(kind.name()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert_matches!(
            StorageBackendType::from_name("nfs"),
            Err(CoreError::Validation(_))
        );
    }
}
