//! Units of work executed by the dispatcher.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use mtk_models::{JobId, JobPayload, TaskOutcome};
use tracing::error;

/// An operation the dispatcher can run for a job.
///
/// Implementations report failures through the returned [`TaskOutcome`]
/// and may be invoked concurrently.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Route path this operation is served on.
    fn endpoint(&self) -> &str;

    async fn run(&self, job_id: &JobId, payload: &JobPayload) -> TaskOutcome;
}

/// Zero-argument task ready to be executed once.
pub type BoxedTask = Box<dyn FnOnce() -> BoxFuture<'static, TaskOutcome> + Send>;

/// Bind a unit of work to its job so it can be moved into the queue.
pub fn bind(unit: Arc<dyn UnitOfWork>, job_id: JobId, payload: JobPayload) -> BoxedTask {
    Box::new(move || async move { unit.run(&job_id, &payload).await }.boxed())
}

/// Run a task, turning a panic into a `500` outcome.
pub async fn run_guarded(task: BoxedTask, endpoint: &str) -> TaskOutcome {
    match AssertUnwindSafe(async move { task().await })
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            let detail = panic_message(panic.as_ref());
            error!(endpoint, panic = %detail, "Unit of work panicked");
            TaskOutcome::failure(endpoint, 500, format!("Unit of work panicked: {}", detail))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
