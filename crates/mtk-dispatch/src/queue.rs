//! Bounded FIFO task queue.
//!
//! Producers reserve a slot with [`TaskQueue::reserve`] and then push the
//! entry through the slot. The reservation is a single compare-and-swap on the
//! depth counter, so concurrent producers can never overshoot the capacity.
//! The single [`QueueReceiver`] is owned by the worker.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use mtk_models::{JobId, JobPayload, QueueCapacity};
use tokio::sync::mpsc;

use crate::error::QueueError;
use crate::unit::BoxedTask;

/// Identity of this process's queue, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueId(String);

impl QueueId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QueueId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One accepted job waiting for the worker.
pub struct QueueEntry {
    pub job_id: JobId,
    pub payload: JobPayload,
    pub endpoint: String,
    pub task: BoxedTask,
    /// Set only for entries that wait in the queue; jobs run in place
    /// report no queue time.
    pub enqueued_at: Option<Instant>,
}

impl fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("job_id", &self.job_id)
            .field("endpoint", &self.endpoint)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

/// Producer side of the queue. Cheap to clone.
#[derive(Clone)]
pub struct TaskQueue {
    id: QueueId,
    capacity: QueueCapacity,
    depth: Arc<AtomicUsize>,
    sender: mpsc::UnboundedSender<QueueEntry>,
}

/// Consumer side of the queue, owned by the worker.
pub struct QueueReceiver {
    depth: Arc<AtomicUsize>,
    receiver: mpsc::UnboundedReceiver<QueueEntry>,
}

impl TaskQueue {
    pub fn new(id: QueueId, capacity: QueueCapacity) -> (Self, QueueReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));

        let queue = Self {
            id,
            capacity,
            depth: depth.clone(),
            sender,
        };
        (queue, QueueReceiver { depth, receiver })
    }

    pub fn id(&self) -> &QueueId {
        &self.id
    }

    pub fn capacity(&self) -> QueueCapacity {
        self.capacity
    }

    /// Entries accepted but not yet picked up by the worker.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserve room for one entry, or fail when the queue is at capacity.
    pub fn reserve(&self) -> Result<QueueSlot, QueueError> {
        if self.sender.is_closed() {
            return Err(QueueError::Closed);
        }

        let capacity = self.capacity;
        self.depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |depth| {
                (!capacity.is_full(depth)).then_some(depth + 1)
            })
            .map_err(|depth| QueueError::Full {
                max: match capacity {
                    QueueCapacity::Limited(max) => max,
                    QueueCapacity::Unlimited => 0,
                },
                depth,
            })?;

        Ok(QueueSlot {
            queue: self.clone(),
            used: false,
        })
    }
}

/// A reserved place in the queue. Dropping it unused releases the place.
pub struct QueueSlot {
    queue: TaskQueue,
    used: bool,
}

impl QueueSlot {
    /// Queue depth including this reservation.
    pub fn depth(&self) -> usize {
        self.queue.len()
    }

    /// Hand the entry to the worker. Returns the depth after insertion.
    pub fn push(mut self, entry: QueueEntry) -> Result<usize, QueueError> {
        self.queue
            .sender
            .send(entry)
            .map_err(|_| QueueError::Closed)?;
        self.used = true;
        Ok(self.queue.len())
    }
}

impl Drop for QueueSlot {
    fn drop(&mut self) {
        if !self.used {
            self.queue.depth.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl QueueReceiver {
    /// Wait for the oldest entry. `None` once every producer is gone and
    /// the queue is drained.
    pub async fn next(&mut self) -> Option<QueueEntry> {
        let entry = self.receiver.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(entry)
    }

    /// Current depth, excluding entries already taken.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use mtk_models::TaskOutcome;

    fn entry(n: usize) -> QueueEntry {
        QueueEntry {
            job_id: JobId::from_string(format!("job-{n}")),
            payload: JobPayload::default(),
            endpoint: "/test".to_string(),
            task: Box::new(|| async { TaskOutcome::success("/test", "ok") }.boxed()),
            enqueued_at: Some(Instant::now()),
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (queue, mut rx) = TaskQueue::new(QueueId::from("q"), QueueCapacity::Unlimited);

        for n in 0..5 {
            queue.reserve().unwrap().push(entry(n)).unwrap();
        }
        assert_eq!(queue.len(), 5);

        for n in 0..5 {
            let next = rx.next().await.unwrap();
            assert_eq!(next.job_id.as_str(), format!("job-{n}"));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capacity_rejects_without_growing() {
        let (queue, _rx) = TaskQueue::new(QueueId::from("q"), QueueCapacity::Limited(2));

        queue.reserve().unwrap().push(entry(0)).unwrap();
        queue.reserve().unwrap().push(entry(1)).unwrap();

        assert_eq!(
            queue.reserve().err(),
            Some(QueueError::Full { max: 2, depth: 2 })
        );
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_unused_slot_is_released() {
        let (queue, _rx) = TaskQueue::new(QueueId::from("q"), QueueCapacity::Limited(1));

        let slot = queue.reserve().unwrap();
        assert_eq!(slot.depth(), 1);
        assert!(queue.reserve().is_err());
        drop(slot);

        assert_eq!(queue.len(), 0);
        tokio_test::assert_ok!(queue.reserve());
    }

    #[test]
    fn test_closed_queue() {
        let (queue, rx) = TaskQueue::new(QueueId::from("q"), QueueCapacity::Unlimited);
        drop(rx);

        assert_eq!(queue.reserve().err(), Some(QueueError::Closed));
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_respect_capacity() {
        let (queue, _rx) = TaskQueue::new(QueueId::from("q"), QueueCapacity::Limited(10));

        let mut handles = Vec::new();
        for n in 0..50 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                queue.reserve().map(|slot| slot.push(entry(n)).is_ok()).unwrap_or(false)
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 10);
        assert_eq!(queue.len(), 10);
    }
}
