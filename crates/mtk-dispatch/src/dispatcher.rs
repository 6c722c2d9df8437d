//! Per-request routing into one of four execution modes.

use std::sync::Arc;
use std::time::Instant;

use mtk_models::{Envelope, JobId, JobPayload, JobStatus};
use mtk_notify::{StatusRecorder, WebhookNotifier};
use tracing::{info, warn};

use crate::envelope::EnvelopeFactory;
use crate::error::{QueueError, TriggerError};
use crate::metrics;
use crate::queue::{QueueEntry, QueueId, TaskQueue};
use crate::runner::JobRunner;
use crate::runtime::{RuntimeContext, DEFAULT_EXECUTION_HANDLE};
use crate::trigger::{JobTrigger, TriggerRequest};
use crate::unit::{bind, UnitOfWork};
use crate::worker::Worker;

/// How a single request is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// This process is a delegated execution: run in place, no queue
    Delegated,
    /// Submit to the remote job environment, never run locally
    Remote,
    /// Run on the calling task
    Inline,
    /// Push onto the task queue and acknowledge with `202`
    Queued,
}

impl ExecutionMode {
    /// First match wins; the process context outranks the caller's intent.
    pub fn classify(context: &RuntimeContext, bypass: bool, payload: &JobPayload) -> Self {
        if context.is_delegated() {
            ExecutionMode::Delegated
        } else if context.remote_job.is_some() && payload.has_webhook() {
            ExecutionMode::Remote
        } else if bypass || !payload.has_webhook() {
            ExecutionMode::Inline
        } else {
            ExecutionMode::Queued
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Delegated => "delegated",
            ExecutionMode::Remote => "remote",
            ExecutionMode::Inline => "inline",
            ExecutionMode::Queued => "queued",
        }
    }
}

/// Entry point for every operation request.
pub struct Dispatcher {
    context: RuntimeContext,
    queue: TaskQueue,
    runner: JobRunner,
    trigger: Option<Arc<dyn JobTrigger>>,
}

impl Dispatcher {
    pub fn new(
        context: RuntimeContext,
        queue: TaskQueue,
        runner: JobRunner,
        trigger: Option<Arc<dyn JobTrigger>>,
    ) -> Self {
        Self {
            context,
            queue,
            runner,
            trigger,
        }
    }

    /// Build a dispatcher together with the worker that drains its queue.
    ///
    /// The worker stops once the dispatcher (the only queue producer) is
    /// dropped and the accepted entries are finished.
    pub fn with_worker(
        context: RuntimeContext,
        recorder: Arc<dyn StatusRecorder>,
        notifier: Arc<dyn WebhookNotifier>,
        trigger: Option<Arc<dyn JobTrigger>>,
        build_number: impl Into<String>,
    ) -> (Self, Worker) {
        let queue_id = QueueId::generate();
        let (queue, receiver) = TaskQueue::new(queue_id.clone(), context.capacity());
        let runner = JobRunner::new(recorder, notifier, EnvelopeFactory::new(build_number));
        let worker = Worker::new(queue_id, receiver, runner.clone());

        (Self::new(context, queue, runner, trigger), worker)
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Run, queue or delegate one request and return its envelope.
    pub async fn dispatch(
        &self,
        unit: Arc<dyn UnitOfWork>,
        payload: JobPayload,
        bypass: bool,
    ) -> Envelope {
        let job_id = JobId::new();
        let mode = ExecutionMode::classify(&self.context, bypass, &payload);
        metrics::record_dispatch(mode);

        info!(
            job_id = %job_id,
            mode = mode.as_str(),
            endpoint = unit.endpoint(),
            "Dispatching job"
        );

        match mode {
            ExecutionMode::Delegated => self.run_delegated(job_id, unit, payload).await,
            ExecutionMode::Remote => self.submit_remote(job_id, unit.endpoint(), payload).await,
            ExecutionMode::Inline => self.run_inline(job_id, unit, payload).await,
            ExecutionMode::Queued => self.enqueue(job_id, unit, payload).await,
        }
    }

    fn entry(
        job_id: JobId,
        unit: Arc<dyn UnitOfWork>,
        payload: JobPayload,
        enqueued_at: Option<Instant>,
    ) -> QueueEntry {
        let endpoint = unit.endpoint().to_string();
        QueueEntry {
            task: bind(unit, job_id.clone(), payload.clone()),
            job_id,
            payload,
            endpoint,
            enqueued_at,
        }
    }

    async fn run_delegated(
        &self,
        job_id: JobId,
        unit: Arc<dyn UnitOfWork>,
        payload: JobPayload,
    ) -> Envelope {
        let handle = self
            .context
            .delegated_execution
            .as_deref()
            .unwrap_or(DEFAULT_EXECUTION_HANDLE);

        self.runner
            .execute(Self::entry(job_id, unit, payload, None), handle, || None)
            .await
    }

    async fn run_inline(
        &self,
        job_id: JobId,
        unit: Arc<dyn UnitOfWork>,
        payload: JobPayload,
    ) -> Envelope {
        let queue = &self.queue;
        self.runner
            .execute(
                Self::entry(job_id, unit, payload, None),
                queue.id().as_str(),
                || Some(queue.len()),
            )
            .await
    }

    async fn submit_remote(&self, job_id: JobId, path: &str, payload: JobPayload) -> Envelope {
        let envelopes = self.runner.envelopes();
        let job = self.context.remote_job.as_ref();

        let submission = match (job, &self.trigger) {
            (Some(job), Some(trigger)) => {
                trigger
                    .trigger(&TriggerRequest::for_job(job, path, &payload))
                    .await
            }
            _ => Err(TriggerError::NotConfigured),
        };

        match (job, submission) {
            (Some(job), Ok(response)) if response.job_submitted => {
                let handle = response.short_handle();
                let envelope =
                    envelopes.submitted(&job_id, &payload, &handle, job, response.execution_name);
                metrics::record_submission(true);
                info!(job_id = %job_id, execution = %handle, "Job submitted to remote execution");

                self.runner
                    .record(JobStatus::Submitted, &job_id, &handle, Some(&envelope))
                    .await;
                envelope
            }
            (_, result) => {
                let detail = match result {
                    Ok(_) => "job was not submitted".to_string(),
                    Err(e) => e.to_string(),
                };
                let envelope = envelopes.submission_failed(
                    &job_id,
                    &payload,
                    DEFAULT_EXECUTION_HANDLE,
                    job,
                    &detail,
                );
                metrics::record_submission(false);
                warn!(job_id = %job_id, error = %detail, "Remote job submission failed");

                self.runner
                    .record(
                        JobStatus::Failed,
                        &job_id,
                        DEFAULT_EXECUTION_HANDLE,
                        Some(&envelope),
                    )
                    .await;
                envelope
            }
        }
    }

    async fn enqueue(
        &self,
        job_id: JobId,
        unit: Arc<dyn UnitOfWork>,
        payload: JobPayload,
    ) -> Envelope {
        let envelopes = self.runner.envelopes();
        let queue_id = self.queue.id().as_str();

        let slot = match self.queue.reserve() {
            Ok(slot) => slot,
            Err(e) => return self.refuse(job_id, payload, e).await,
        };

        let accepted = envelopes.accepted(
            &job_id,
            &payload,
            queue_id,
            slot.depth(),
            self.queue.capacity(),
        );
        self.runner
            .record(JobStatus::Queued, &job_id, queue_id, Some(&accepted))
            .await;

        match slot.push(Self::entry(
            job_id.clone(),
            unit,
            payload.clone(),
            Some(Instant::now()),
        )) {
            Ok(depth) => {
                metrics::set_queue_length(depth);
                info!(job_id = %job_id, queue_id, queue_length = depth, "Job queued");
                accepted
            }
            Err(e) => {
                // `queued` is already recorded; only `running` may follow it.
                self.runner
                    .record(JobStatus::Running, &job_id, queue_id, None)
                    .await;
                self.refuse(job_id, payload, e).await
            }
        }
    }

    /// Terminal envelope for work the queue would not take.
    async fn refuse(&self, job_id: JobId, payload: JobPayload, error: QueueError) -> Envelope {
        let envelopes = self.runner.envelopes();
        let queue_id = self.queue.id().as_str();

        let envelope = match error {
            QueueError::Full { max, depth } => {
                metrics::record_rejection();
                warn!(job_id = %job_id, queue_length = depth, max, "Queue full, rejecting job");
                envelopes.rejected(&job_id, &payload, queue_id, depth, max)
            }
            QueueError::Closed => {
                warn!(job_id = %job_id, "Queue closed, rejecting job");
                envelopes.unavailable(&job_id, &payload, queue_id, error.to_string())
            }
        };

        self.runner
            .record(JobStatus::Done, &job_id, queue_id, Some(&envelope))
            .await;
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueReceiver;
    use crate::runtime::RemoteJob;
    use async_trait::async_trait;
    use mtk_models::{QueueCapacity, StatusEvent, TaskOutcome};
    use mtk_notify::{MemoryStatusRecorder, NotifyResult};
    use serde_json::json;
    use std::sync::Mutex;

    fn payload(value: serde_json::Value) -> JobPayload {
        JobPayload::from_value(value).unwrap()
    }

    fn remote() -> RuntimeContext {
        RuntimeContext {
            remote_job: Some(RemoteJob {
                name: "media-job".into(),
                location: "us-central1".into(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_order() {
        let hook = payload(json!({"webhook_url": "https://cb"}));
        let plain = payload(json!({}));
        let delegated = RuntimeContext {
            delegated_execution: Some("exec".into()),
            ..remote()
        };

        assert_eq!(ExecutionMode::classify(&delegated, false, &hook), ExecutionMode::Delegated);
        assert_eq!(ExecutionMode::classify(&remote(), true, &hook), ExecutionMode::Remote);
        assert_eq!(ExecutionMode::classify(&remote(), false, &plain), ExecutionMode::Inline);

        let local = RuntimeContext::default();
        assert_eq!(ExecutionMode::classify(&local, true, &hook), ExecutionMode::Inline);
        assert_eq!(ExecutionMode::classify(&local, false, &plain), ExecutionMode::Inline);
        assert_eq!(ExecutionMode::classify(&local, false, &hook), ExecutionMode::Queued);
    }

    #[test]
    fn test_empty_webhook_runs_inline() {
        let empty = payload(json!({"webhook_url": ""}));
        assert_eq!(
            ExecutionMode::classify(&remote(), false, &empty),
            ExecutionMode::Inline
        );
    }

    /// Shuts the worker side down as soon as a job is recorded as queued.
    struct ClosingRecorder {
        inner: MemoryStatusRecorder,
        receiver: Mutex<Option<QueueReceiver>>,
    }

    #[async_trait]
    impl StatusRecorder for ClosingRecorder {
        async fn record(&self, event: &StatusEvent) -> NotifyResult<()> {
            if event.job_status == JobStatus::Queued {
                drop(self.receiver.lock().unwrap().take());
            }
            self.inner.record(event).await
        }

        async fn latest(&self, job_id: &JobId) -> NotifyResult<Option<StatusEvent>> {
            self.inner.latest(job_id).await
        }
    }

    struct SilentNotifier;

    #[async_trait]
    impl WebhookNotifier for SilentNotifier {
        async fn notify(&self, _url: &str, _envelope: &Envelope) {}
    }

    struct Noop;

    #[async_trait]
    impl UnitOfWork for Noop {
        fn endpoint(&self) -> &str {
            "/v1/video/loop"
        }

        async fn run(&self, _job_id: &JobId, _payload: &JobPayload) -> TaskOutcome {
            TaskOutcome::success(self.endpoint(), "ok")
        }
    }

    #[tokio::test]
    async fn test_queue_closing_after_acceptance_stays_monotonic() {
        let (queue, receiver) = TaskQueue::new(QueueId::from("q"), QueueCapacity::Unlimited);
        let recorder = Arc::new(ClosingRecorder {
            inner: MemoryStatusRecorder::new(),
            receiver: Mutex::new(Some(receiver)),
        });
        let runner = JobRunner::new(
            recorder.clone(),
            Arc::new(SilentNotifier),
            EnvelopeFactory::new("1"),
        );
        let dispatcher = Dispatcher::new(RuntimeContext::default(), queue, runner, None);

        let envelope = dispatcher
            .dispatch(Arc::new(Noop), payload(json!({"webhook_url": "https://cb"})), false)
            .await;

        assert_eq!(envelope.code, 503);
        assert!(dispatcher.queue().is_empty());

        let sequence: Vec<JobStatus> = recorder
            .inner
            .events(&envelope.job_id)
            .await
            .into_iter()
            .map(|e| e.job_status)
            .collect();
        assert_eq!(
            sequence,
            vec![JobStatus::Queued, JobStatus::Running, JobStatus::Done]
        );
        assert!(JobStatus::is_monotonic(&sequence));
    }
}
