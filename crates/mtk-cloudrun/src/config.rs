//! Cloud Run client configuration.

use std::time::Duration;

const DEFAULT_API_URL: &str = "https://run.googleapis.com";

/// Cloud Run Admin API configuration.
#[derive(Debug, Clone)]
pub struct CloudRunConfig {
    /// GCP project ID; taken from the credentials when unset
    pub project_id: Option<String>,
    /// API base URL (overridable for emulators and tests)
    pub api_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl Default for CloudRunConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl CloudRunConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            project_id: std::env::var("GCP_PROJECT_ID")
                .ok()
                .filter(|s| !s.is_empty()),
            api_url: std::env::var("CLOUD_RUN_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            ..defaults
        }
    }
}
