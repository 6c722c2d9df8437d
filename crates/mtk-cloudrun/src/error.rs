//! Cloud Run adapter error types.

use mtk_dispatch::TriggerError;
use thiserror::Error;

pub type CloudRunResult<T> = Result<T, CloudRunError>;

#[derive(Debug, Error)]
pub enum CloudRunError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Cloud Run API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudRunError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }
}

impl From<CloudRunError> for TriggerError {
    fn from(err: CloudRunError) -> Self {
        match err {
            CloudRunError::AuthError(msg) => TriggerError::Auth(msg),
            CloudRunError::Api { status, message } => TriggerError::Api { status, message },
            CloudRunError::InvalidResponse(msg) => TriggerError::InvalidResponse(msg),
            CloudRunError::Network(e) => TriggerError::Request(e.to_string()),
            CloudRunError::Json(e) => TriggerError::InvalidResponse(e.to_string()),
        }
    }
}
