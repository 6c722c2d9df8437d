//! Dispatch error types.

use thiserror::Error;

pub type TriggerResult<T> = Result<T, TriggerError>;

/// Errors reported by a remote job trigger adapter.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Remote delegation is not configured")]
    NotConfigured,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TriggerError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }
}

/// Errors when pushing onto the task queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("MAX_QUEUE_LENGTH ({max}) reached")]
    Full { max: usize, depth: usize },

    #[error("Task queue is closed")]
    Closed,
}
