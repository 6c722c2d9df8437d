//! The single background worker draining the task queue.

use tokio::task::JoinHandle;
use tracing::info;

use crate::metrics;
use crate::queue::{QueueId, QueueReceiver};
use crate::runner::JobRunner;

/// Executes queued entries one at a time, oldest first.
///
/// Runs until every [`TaskQueue`](crate::TaskQueue) handle has been dropped,
/// then finishes the entries already accepted and exits.
pub struct Worker {
    queue_id: QueueId,
    receiver: QueueReceiver,
    runner: JobRunner,
}

impl Worker {
    pub fn new(queue_id: QueueId, receiver: QueueReceiver, runner: JobRunner) -> Self {
        Self {
            queue_id,
            receiver,
            runner,
        }
    }

    /// Spawn the worker loop on the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!(queue_id = %self.queue_id, "Worker started");
        let mut processed: u64 = 0;

        while let Some(entry) = self.receiver.next().await {
            metrics::set_queue_length(self.receiver.len());

            let receiver = &self.receiver;
            self.runner
                .execute(entry, self.queue_id.as_str(), || Some(receiver.len()))
                .await;
            processed += 1;
        }

        info!(queue_id = %self.queue_id, processed, "Worker stopped, queue drained");
    }
}
