//! Artifact storage for operation results.
//!
//! Every unit of work uploads its output file through an [`ArtifactStore`]
//! and returns the resulting URL as its success value.

pub mod error;
pub mod local;
pub mod mime;
pub mod s3;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

pub use error::{StorageError, StorageResult};
pub use local::LocalArtifactStore;
pub use mime::content_type_for;
pub use s3::{S3ArtifactStore, S3Config};

/// Destination for finished artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store the file under its file name and return its public URL.
    async fn upload(&self, path: &Path) -> StorageResult<String>;

    /// Short backend name for logs.
    fn kind(&self) -> &'static str;
}

/// S3 when `S3_*` variables are configured, otherwise the local directory.
pub async fn store_from_env(local_root: impl AsRef<Path>) -> StorageResult<Arc<dyn ArtifactStore>> {
    match S3Config::from_env()? {
        Some(config) => {
            info!(bucket = %config.bucket_name, "Using S3 artifact storage");
            Ok(Arc::new(S3ArtifactStore::new(config)))
        }
        None => {
            info!(root = %local_root.as_ref().display(), "Using local artifact storage");
            Ok(Arc::new(LocalArtifactStore::new(local_root.as_ref())))
        }
    }
}

/// File name of an artifact, used as its storage key.
pub(crate) fn artifact_name(path: &Path) -> StorageResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StorageError::InvalidKey(path.display().to_string()))
}
