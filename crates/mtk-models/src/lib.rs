//! Shared data models for the media toolkit.
//!
//! This crate provides Serde-serializable types for:
//! - Job identifiers and lifecycle statuses
//! - Request payloads as captured at dispatch time
//! - Unit-of-work outcomes
//! - The uniform response envelope and status events

pub mod envelope;
pub mod job;
pub mod outcome;
pub mod payload;
pub mod status_event;

// Re-export common types
pub use envelope::{round_secs, Envelope, ExecutionReport, QueueCapacity};
pub use job::{JobId, JobStatus};
pub use outcome::TaskOutcome;
pub use payload::{JobPayload, PayloadError};
pub use status_event::StatusEvent;
