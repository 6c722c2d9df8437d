//! Job identity and lifecycle status.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status recorded for a job.
///
/// Statuses only move forward: `queued -> running -> done`, `running -> done`,
/// or a single hop into `submitted`/`failed` for delegated submissions. A
/// queue-full rejection is recorded as a lone `done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted into the local task queue
    Queued,
    /// Unit of work is executing
    Running,
    /// Handed to the remote job environment
    Submitted,
    /// Execution finished (successfully or not)
    Done,
    /// Remote submission failed
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Submitted => "submitted",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more events expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Submitted | JobStatus::Failed)
    }

    /// Whether `next` may be recorded after `previous` (`None` = first event).
    pub fn can_follow(previous: Option<JobStatus>, next: JobStatus) -> bool {
        match previous {
            None => true,
            Some(JobStatus::Queued) => next == JobStatus::Running,
            Some(JobStatus::Running) => next == JobStatus::Done,
            Some(_) => false,
        }
    }

    /// Check that a full recorded sequence never regresses.
    pub fn is_monotonic(sequence: &[JobStatus]) -> bool {
        let mut previous = None;
        for status in sequence {
            if !Self::can_follow(previous, *status) {
                return false;
            }
            previous = Some(*status);
        }
        true
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&JobStatus::Submitted).unwrap();
        assert_eq!(json, "\"submitted\"");
    }

    #[test]
    fn test_monotonic_sequences() {
        use JobStatus::*;

        assert!(JobStatus::is_monotonic(&[Queued, Running, Done]));
        assert!(JobStatus::is_monotonic(&[Running, Done]));
        assert!(JobStatus::is_monotonic(&[Submitted]));
        assert!(JobStatus::is_monotonic(&[Failed]));
        assert!(JobStatus::is_monotonic(&[Done]));

        assert!(!JobStatus::is_monotonic(&[Running, Queued]));
        assert!(!JobStatus::is_monotonic(&[Queued, Done]));
        assert!(!JobStatus::is_monotonic(&[Done, Running]));
        assert!(!JobStatus::is_monotonic(&[Submitted, Done]));
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
    }
}
