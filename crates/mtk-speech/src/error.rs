//! Speech client error types.

use thiserror::Error;

pub type SpeechResult<T> = Result<T, SpeechError>;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("TTS service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("TTS request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to load speech model: {0}")]
    ModelLoad(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpeechError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SpeechError::ServiceUnavailable(_) => true,
            SpeechError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
