//! S3-compatible artifact store.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::mime::content_type_for;
use crate::{artifact_name, ArtifactStore};

/// Configuration for an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Custom endpoint (MinIO, R2, DigitalOcean Spaces); AWS when unset
    pub endpoint_url: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub bucket_name: String,
    /// Region ("auto" for most S3-compatible providers)
    pub region: String,
    /// Base URL artifacts are publicly served from
    pub public_url: Option<String>,
}

impl S3Config {
    /// Read `S3_*` variables. `None` when no bucket is configured.
    pub fn from_env() -> StorageResult<Option<Self>> {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let Some(bucket_name) = var("S3_BUCKET_NAME") else {
            return Ok(None);
        };

        Ok(Some(Self {
            endpoint_url: var("S3_ENDPOINT_URL"),
            access_key: var("S3_ACCESS_KEY")
                .ok_or_else(|| StorageError::config_error("S3_ACCESS_KEY not set"))?,
            secret_key: var("S3_SECRET_KEY")
                .ok_or_else(|| StorageError::config_error("S3_SECRET_KEY not set"))?,
            bucket_name,
            region: var("S3_REGION").unwrap_or_else(|| "auto".to_string()),
            public_url: var("S3_PUBLIC_URL"),
        }))
    }
}

/// Uploads artifacts to an S3 bucket and returns their public URLs.
#[derive(Clone)]
pub struct S3ArtifactStore {
    client: Client,
    config: S3Config,
}

impl S3ArtifactStore {
    pub fn new(config: S3Config) -> Self {
        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "mtk-s3");

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(config.endpoint_url.is_some());
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            config,
        }
    }

    /// Public URL of an object key.
    pub fn public_url(&self, key: &str) -> String {
        if let Some(base) = &self.config.public_url {
            return format!("{}/{}", base.trim_end_matches('/'), key);
        }
        match &self.config.endpoint_url {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.config.bucket_name,
                key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.config.bucket_name, self.config.region, key
            ),
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn upload(&self, path: &Path) -> StorageResult<String> {
        let key = artifact_name(path)?;
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .body(body)
            .content_type(content_type_for(path))
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let url = self.public_url(&key);
        info!("Uploaded {} to {}", path.display(), url);
        Ok(url)
    }

    fn kind(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            endpoint_url: Some("https://minio.local:9000/".into()),
            access_key: "ak".into(),
            secret_key: "sk".into(),
            bucket_name: "media".into(),
            region: "auto".into(),
            public_url: None,
        }
    }

    #[test]
    fn test_public_url_path_style() {
        let store = S3ArtifactStore::new(config());
        assert_eq!(
            store.public_url("out.mp4"),
            "https://minio.local:9000/media/out.mp4"
        );
    }

    #[test]
    fn test_public_url_override() {
        let store = S3ArtifactStore::new(S3Config {
            public_url: Some("https://cdn.example.com/".into()),
            ..config()
        });
        assert_eq!(store.public_url("a.wav"), "https://cdn.example.com/a.wav");
    }

    #[test]
    fn test_public_url_aws() {
        let store = S3ArtifactStore::new(S3Config {
            endpoint_url: None,
            region: "eu-west-1".into(),
            ..config()
        });
        assert_eq!(
            store.public_url("f.jpg"),
            "https://media.s3.eu-west-1.amazonaws.com/f.jpg"
        );
    }
}
