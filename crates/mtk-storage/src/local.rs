//! Local directory artifact store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::{StorageError, StorageResult};
use crate::{artifact_name, ArtifactStore};

/// Keeps artifacts in a directory and hands out `file://` URLs.
///
/// Files stored here are also served by the media download route.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn upload(&self, path: &Path) -> StorageResult<String> {
        let name = artifact_name(path)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let dest = self.root.join(&name);
        let source = tokio::fs::canonicalize(path).await?;
        let same_file = match tokio::fs::canonicalize(&dest).await {
            Ok(existing) => existing == source,
            Err(_) => false,
        };
        if !same_file {
            tokio::fs::copy(&source, &dest).await?;
        }

        let dest = tokio::fs::canonicalize(&dest).await?;
        let url = Url::from_file_path(&dest)
            .map_err(|_| StorageError::InvalidKey(dest.display().to_string()))?;

        debug!(path = %dest.display(), "Stored artifact locally");
        Ok(url.to_string())
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_copies_into_root() {
        let root = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let file = work.path().join("job-1_looped.mp4");
        std::fs::write(&file, b"video").unwrap();

        let store = LocalArtifactStore::new(root.path());
        let url = store.upload(&file).await.unwrap();

        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/job-1_looped.mp4"));
        assert_eq!(
            std::fs::read(root.path().join("job-1_looped.mp4")).unwrap(),
            b"video"
        );
    }

    #[tokio::test]
    async fn test_upload_in_place() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("frame.jpg");
        std::fs::write(&file, b"jpeg").unwrap();

        let store = LocalArtifactStore::new(root.path());
        store.upload(&file).await.unwrap();

        assert_eq!(std::fs::read(&file).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(root.path());

        assert!(store.upload(&root.path().join("nope.mp4")).await.is_err());
    }
}
