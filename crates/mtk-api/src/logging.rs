//! Per-run log trail for operations.
//!
//! Every line of one run sits inside a `unit` span carrying the same
//! `job_id` and `endpoint` fields the dispatcher logs with, so a job can be
//! followed from dispatch through each media step to its outcome.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use mtk_models::{JobId, TaskOutcome};
use tracing::{error, info, warn, Span};

/// Numbered step log for one run of an operation.
#[derive(Debug)]
pub struct JobLogger {
    job_id: JobId,
    operation: &'static str,
    endpoint: &'static str,
    started: Instant,
    steps: AtomicU32,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &'static str, endpoint: &'static str) -> Self {
        Self {
            job_id: job_id.clone(),
            operation,
            endpoint,
            started: Instant::now(),
            steps: AtomicU32::new(0),
        }
    }

    pub fn span(&self) -> Span {
        tracing::info_span!(
            "unit",
            job_id = %self.job_id,
            operation = self.operation,
            endpoint = self.endpoint
        )
    }

    /// Log the next media or speech step.
    pub fn step(&self, what: &str) {
        let step = self.steps.fetch_add(1, Ordering::Relaxed) + 1;
        info!(step, elapsed_ms = self.elapsed_ms(), "{}", what);
    }

    /// The run continues with a substitute value.
    pub fn fallback(&self, what: &str) {
        warn!(elapsed_ms = self.elapsed_ms(), "Fallback: {}", what);
    }

    /// Final line of the run, at error level for failed outcomes.
    pub fn finish(&self, outcome: &TaskOutcome) {
        let steps = self.steps_taken();
        let elapsed_ms = self.elapsed_ms();
        if outcome.is_success() {
            info!(steps, elapsed_ms, artifact = %outcome.message(), "Operation finished");
        } else {
            error!(
                steps,
                elapsed_ms,
                code = outcome.code,
                "Operation failed: {}",
                outcome.message()
            );
        }
    }

    pub fn steps_taken(&self) -> u32 {
        self.steps.load(Ordering::Relaxed)
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_are_numbered_in_order() {
        let logger = JobLogger::new(&JobId::from_string("job-123"), "video_loop", "/v1/video/loop");
        assert_eq!(logger.steps_taken(), 0);

        logger.step("Downloading source");
        logger.step("Looping video 3 times");
        logger.fallback("no frame size");

        assert_eq!(logger.steps_taken(), 2);
        logger.finish(&TaskOutcome::failure("/v1/video/loop", 500, "ffmpeg exited 1"));
        assert_eq!(logger.steps_taken(), 2);
    }
}
