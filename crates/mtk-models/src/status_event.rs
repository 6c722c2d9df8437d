//! Lifecycle events emitted to the job status recorder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::job::{JobId, JobStatus};

/// One lifecycle transition of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub job_status: JobStatus,
    pub job_id: JobId,
    pub queue_id: String,
    pub process_id: u32,
    /// Envelope snapshot attached to the transition, if any
    pub response: Option<Envelope>,
    pub recorded_at: DateTime<Utc>,
}

impl StatusEvent {
    pub fn new(
        job_status: JobStatus,
        job_id: JobId,
        queue_id: impl Into<String>,
        response: Option<Envelope>,
    ) -> Self {
        Self {
            job_status,
            job_id,
            queue_id: queue_id.into(),
            process_id: std::process::id(),
            response,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = StatusEvent::new(JobStatus::Running, JobId::from_string("j1"), "q1", None);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["job_status"], "running");
        assert_eq!(value["job_id"], "j1");
        assert_eq!(value["queue_id"], "q1");
        assert!(value["response"].is_null());
        assert_eq!(value["process_id"], std::process::id());
    }
}
