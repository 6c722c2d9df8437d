//! HTTP download of job inputs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{MediaError, MediaResult};

/// Streams remote media into local files.
#[derive(Debug, Clone)]
pub struct Downloader {
    http: Client,
}

impl Downloader {
    pub fn new(timeout: Duration) -> MediaResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("mtk-media/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::download_failed(format!("HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Download `url` into `dir` as `{stem}.{ext}`.
    ///
    /// The extension comes from the URL path, or `default_ext` when the
    /// path has none.
    pub async fn download(
        &self,
        url: &str,
        dir: &Path,
        stem: &str,
        default_ext: &str,
    ) -> MediaResult<PathBuf> {
        let parsed = Url::parse(url)
            .map_err(|e| MediaError::download_failed(format!("Invalid URL {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MediaError::download_failed(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let ext = extension_from_url(&parsed).unwrap_or_else(|| default_ext.to_string());
        let dest = dir.join(format!("{}.{}", stem, ext));
        let partial = dest.with_extension(format!("{}.part", ext));

        debug!(url = %url, dest = %dest.display(), "Downloading");
        let response = self
            .http
            .get(parsed)
            .send()
            .await
            .map_err(|e| MediaError::download_failed(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::download_failed(format!(
                "{} returned HTTP {}",
                url,
                status.as_u16()
            )));
        }

        let mut file = fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::download_failed(format!("{}: {}", url, e)))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        if written == 0 {
            let _ = fs::remove_file(&partial).await;
            return Err(MediaError::download_failed(format!("{} returned an empty body", url)));
        }

        fs::rename(&partial, &dest).await?;
        metrics::counter!("mtk_download_bytes_total").increment(written);
        info!(url = %url, bytes = written, "Downloaded {}", dest.display());
        Ok(dest)
    }
}

/// Lowercase extension of the last URL path segment.
fn extension_from_url(url: &Url) -> Option<String> {
    let name = url.path_segments()?.last()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extension_from_url() {
        let url = Url::parse("https://cdn.example.com/a/clip.MP4?sig=1").unwrap();
        assert_eq!(extension_from_url(&url).as_deref(), Some("mp4"));

        let url = Url::parse("https://cdn.example.com/a/clip").unwrap();
        assert_eq!(extension_from_url(&url), None);
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/voice.wav"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF0000WAVE".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(Duration::from_secs(5)).unwrap();
        let path = downloader
            .download(&format!("{}/media/voice.wav", server.uri()), dir.path(), "input", "mp4")
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "input.wav");
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF0000WAVE");
    }

    #[tokio::test]
    async fn test_download_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(Duration::from_secs(5)).unwrap();
        let err = downloader
            .download(&format!("{}/missing", server.uri()), dir.path(), "input", "mp4")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_download_rejects_non_http() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(Duration::from_secs(5)).unwrap();
        let err = downloader
            .download("file:///etc/passwd", dir.path(), "input", "mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::DownloadFailed { .. }));
    }
}
