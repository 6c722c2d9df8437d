//! Shared execution path for the delegated, inline and queued modes.

use std::sync::Arc;
use std::time::Instant;

use mtk_models::{Envelope, JobId, JobStatus, StatusEvent};
use mtk_notify::{StatusRecorder, WebhookNotifier};
use tracing::{info, warn};

use crate::envelope::EnvelopeFactory;
use crate::metrics;
use crate::queue::QueueEntry;
use crate::unit::run_guarded;

/// Runs one job end to end and reports it to the lifecycle sinks.
#[derive(Clone)]
pub struct JobRunner {
    recorder: Arc<dyn StatusRecorder>,
    notifier: Arc<dyn WebhookNotifier>,
    envelopes: EnvelopeFactory,
}

impl JobRunner {
    pub fn new(
        recorder: Arc<dyn StatusRecorder>,
        notifier: Arc<dyn WebhookNotifier>,
        envelopes: EnvelopeFactory,
    ) -> Self {
        Self {
            recorder,
            notifier,
            envelopes,
        }
    }

    pub fn envelopes(&self) -> &EnvelopeFactory {
        &self.envelopes
    }

    /// Record a status event. Recorder failures are logged only.
    pub async fn record(
        &self,
        status: JobStatus,
        job_id: &JobId,
        queue_id: &str,
        response: Option<&Envelope>,
    ) {
        let event = StatusEvent::new(status, job_id.clone(), queue_id, response.cloned());
        if let Err(e) = self.recorder.record(&event).await {
            warn!(job_id = %job_id, status = %status, error = %e, "Failed to record job status");
        }
    }

    /// Deliver the envelope when the payload names a webhook.
    pub async fn notify(&self, envelope: &Envelope, webhook_url: Option<&str>) {
        if let Some(url) = webhook_url {
            self.notifier.notify(url, envelope).await;
        }
    }

    /// Execute an entry: `running`, run the task, `done`, then the webhook.
    ///
    /// `queue_length` is sampled when the envelope is built; `None` omits
    /// the field.
    pub async fn execute<F>(&self, entry: QueueEntry, queue_id: &str, queue_length: F) -> Envelope
    where
        F: Fn() -> Option<usize> + Send,
    {
        let QueueEntry {
            job_id,
            payload,
            endpoint,
            task,
            enqueued_at,
        } = entry;

        self.record(JobStatus::Running, &job_id, queue_id, None).await;

        let started = Instant::now();
        let queued = enqueued_at
            .map(|at| started.saturating_duration_since(at))
            .unwrap_or_default();
        info!(job_id = %job_id, queue_id, endpoint = %endpoint, "Job started");

        let outcome = run_guarded(task, &endpoint).await;
        let ran = started.elapsed();

        let envelope = self.envelopes.executed(
            &job_id,
            &payload,
            &outcome,
            queue_id,
            queued,
            ran,
            queue_length(),
        );
        metrics::record_completion(&endpoint, outcome.code, ran.as_secs_f64());

        if outcome.is_success() {
            info!(job_id = %job_id, endpoint = %endpoint, run_secs = ran.as_secs_f64(), "Job completed");
        } else {
            warn!(
                job_id = %job_id,
                endpoint = %endpoint,
                code = outcome.code,
                error = %envelope.message,
                "Job failed"
            );
        }

        self.record(JobStatus::Done, &job_id, queue_id, Some(&envelope)).await;
        self.notify(&envelope, payload.webhook_url()).await;

        envelope
    }
}
