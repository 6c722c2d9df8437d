//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Required `X-API-Key` for `/v1` routes, when set
    pub api_key: Option<String>,
    /// Artifacts, job workspaces and status logs live here
    pub local_storage_path: PathBuf,
    /// Reported in every envelope
    pub build_number: String,
    /// How long shutdown waits for the worker to drain the queue
    pub shutdown_timeout: Duration,
    pub metrics_enabled: bool,
    /// Per-command FFmpeg limit
    pub ffmpeg_timeout: Duration,
    /// Per-file download limit
    pub download_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            max_body_size: 10 * 1024 * 1024, // 10MB
            api_key: None,
            local_storage_path: PathBuf::from("/tmp"),
            build_number: env!("CARGO_PKG_VERSION").to_string(),
            shutdown_timeout: Duration::from_secs(30),
            metrics_enabled: true,
            ffmpeg_timeout: Duration::from_secs(3600),
            download_timeout: Duration::from_secs(600),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            host: lookup("API_HOST").unwrap_or(defaults.host),
            port: lookup("API_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: lookup("MAX_BODY_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            api_key: lookup("API_KEY").filter(|k| !k.trim().is_empty()),
            local_storage_path: lookup("LOCAL_STORAGE_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.local_storage_path),
            build_number: lookup("BUILD_NUMBER")
                .filter(|b| !b.trim().is_empty())
                .unwrap_or(defaults.build_number),
            shutdown_timeout: secs("SHUTDOWN_TIMEOUT_SECS", defaults.shutdown_timeout),
            metrics_enabled: lookup("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
            ffmpeg_timeout: secs("FFMPEG_TIMEOUT_SECS", defaults.ffmpeg_timeout),
            download_timeout: secs("DOWNLOAD_TIMEOUT_SECS", defaults.download_timeout),
        }
    }

    /// Scratch directories for running jobs.
    pub fn work_dir(&self) -> PathBuf {
        self.local_storage_path.join("work")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(|_| None);
        assert_eq!(config.port, 8080);
        assert!(config.api_key.is_none());
        assert!(config.metrics_enabled);
        assert_eq!(config.work_dir(), PathBuf::from("/tmp/work"));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("API_PORT", "9000"),
            ("API_KEY", "secret"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("LOCAL_STORAGE_PATH", "/data"),
            ("BUILD_NUMBER", "42"),
            ("SHUTDOWN_TIMEOUT_SECS", "5"),
            ("METRICS_ENABLED", "false"),
        ]
        .into_iter()
        .collect();
        let config = ApiConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.port, 9000);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.cors_origins, ["https://a.example", "https://b.example"]);
        assert_eq!(config.local_storage_path, PathBuf::from("/data"));
        assert_eq!(config.build_number, "42");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert!(!config.metrics_enabled);
    }
}
