//! Construction of the uniform response envelope for every execution path.

use std::time::Duration;

use mtk_models::{Envelope, ExecutionReport, JobId, JobPayload, QueueCapacity, TaskOutcome};

use crate::runtime::RemoteJob;

/// Builds envelopes stamped with this process's pid and build number.
#[derive(Debug, Clone)]
pub struct EnvelopeFactory {
    pid: u32,
    build_number: String,
}

impl EnvelopeFactory {
    pub fn new(build_number: impl Into<String>) -> Self {
        Self {
            pid: std::process::id(),
            build_number: build_number.into(),
        }
    }

    pub fn build_number(&self) -> &str {
        &self.build_number
    }

    fn base(
        &self,
        job_id: &JobId,
        payload: &JobPayload,
        code: u16,
        message: impl Into<String>,
        queue_id: &str,
    ) -> Envelope {
        Envelope {
            code,
            id: payload.correlation_id(),
            job_id: job_id.clone(),
            message: message.into(),
            pid: self.pid,
            queue_id: queue_id.to_string(),
            build_number: self.build_number.clone(),
            execution: None,
            queue_length: None,
            max_queue_length: None,
            job_name: None,
            location: None,
            execution_name: None,
        }
    }

    /// Envelope for a unit of work that has run.
    #[allow(clippy::too_many_arguments)]
    pub fn executed(
        &self,
        job_id: &JobId,
        payload: &JobPayload,
        outcome: &TaskOutcome,
        queue_id: &str,
        queued: Duration,
        ran: Duration,
        queue_length: Option<usize>,
    ) -> Envelope {
        let mut envelope = self.base(job_id, payload, outcome.code, outcome.message(), queue_id);
        envelope.execution = Some(ExecutionReport::new(outcome, queued, ran));
        envelope.queue_length = queue_length;
        envelope
    }

    /// `202` acknowledgement for an accepted queue entry.
    pub fn accepted(
        &self,
        job_id: &JobId,
        payload: &JobPayload,
        queue_id: &str,
        queue_length: usize,
        capacity: QueueCapacity,
    ) -> Envelope {
        let mut envelope = self.base(job_id, payload, 202, "processing", queue_id);
        envelope.queue_length = Some(queue_length);
        envelope.max_queue_length = Some(capacity);
        envelope
    }

    /// `429` rejection when the queue is at capacity.
    pub fn rejected(
        &self,
        job_id: &JobId,
        payload: &JobPayload,
        queue_id: &str,
        queue_length: usize,
        max: usize,
    ) -> Envelope {
        let message = format!("MAX_QUEUE_LENGTH ({}) reached", max);
        let mut envelope = self.base(job_id, payload, 429, message, queue_id);
        envelope.queue_length = Some(queue_length);
        envelope
    }

    /// `503` when the queue no longer accepts work (shutdown in progress).
    pub fn unavailable(
        &self,
        job_id: &JobId,
        payload: &JobPayload,
        queue_id: &str,
        message: impl Into<String>,
    ) -> Envelope {
        self.base(job_id, payload, 503, message, queue_id)
    }

    /// `200` after a successful remote submission.
    pub fn submitted(
        &self,
        job_id: &JobId,
        payload: &JobPayload,
        handle: &str,
        job: &RemoteJob,
        execution_name: Option<String>,
    ) -> Envelope {
        let mut envelope = self.base(job_id, payload, 200, "success", handle);
        envelope.job_name = Some(job.name.clone());
        envelope.location = Some(job.location.clone());
        envelope.execution_name = execution_name;
        envelope
    }

    /// `500` after a failed remote submission.
    pub fn submission_failed(
        &self,
        job_id: &JobId,
        payload: &JobPayload,
        handle: &str,
        job: Option<&RemoteJob>,
        detail: impl std::fmt::Display,
    ) -> Envelope {
        let message = format!("GCP Cloud Run Job trigger failed: {}", detail);
        let mut envelope = self.base(job_id, payload, 500, message, handle);
        envelope.job_name = job.map(|j| j.name.clone());
        envelope.location = job.map(|j| j.location.clone());
        envelope
    }
}
