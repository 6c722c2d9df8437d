//! Locally stored artifact download.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use mtk_storage::content_type_for;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Serve a file from the local storage directory.
pub async fn download_media(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    if !is_plain_file_name(&filename) {
        warn!(filename = %filename, "Rejected media download path");
        return Err(ApiError::bad_request("Invalid file name"));
    }

    let path = resolve(&state.config.local_storage_path, &filename)
        .await
        .ok_or_else(|| ApiError::not_found(format!("File {} not found", filename)))?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to read media file");
        ApiError::not_found(format!("File {} not found", filename))
    })?;
    debug!(path = %path.display(), size = bytes.len(), "Serving media file");

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|_| ApiError::bad_request("Invalid file name"))?;
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(content_type_for(&path))),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    Ok((headers, bytes).into_response())
}

/// A single path segment: no separators, no parent references, no dotfiles.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..")
}

/// Canonical path of `name` under `root`, if it is a regular file there.
async fn resolve(root: &FsPath, name: &str) -> Option<PathBuf> {
    let root = tokio::fs::canonicalize(root).await.ok()?;
    let path = tokio::fs::canonicalize(root.join(name)).await.ok()?;
    let metadata = tokio::fs::metadata(&path).await.ok()?;

    (path.starts_with(&root) && metadata.is_file()).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("job-1_looped.mp4"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name("../secret"));
        assert!(!is_plain_file_name("a/b.mp4"));
        assert!(!is_plain_file_name("a\\b.mp4"));
        assert!(!is_plain_file_name(".env"));
    }

    #[tokio::test]
    async fn test_resolve_rejects_symlink_escape() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "x").unwrap();
        std::fs::write(root.path().join("clip.mp4"), "y").unwrap();

        #[cfg(unix)]
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), root.path().join("link.txt"))
            .unwrap();

        assert!(resolve(root.path(), "clip.mp4").await.is_some());
        assert!(resolve(root.path(), "missing.mp4").await.is_none());
        #[cfg(unix)]
        assert!(resolve(root.path(), "link.txt").await.is_none());
    }
}
