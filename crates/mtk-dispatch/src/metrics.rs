//! Dispatch metrics.

use metrics::{counter, gauge, histogram};

use crate::dispatcher::ExecutionMode;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_DISPATCHED_TOTAL: &str = "mtk_jobs_dispatched_total";
    pub const JOBS_REJECTED_TOTAL: &str = "mtk_jobs_rejected_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "mtk_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "mtk_jobs_failed_total";
    pub const JOB_RUN_SECONDS: &str = "mtk_job_run_seconds";
    pub const QUEUE_LENGTH: &str = "mtk_queue_length";
    pub const REMOTE_SUBMISSIONS_TOTAL: &str = "mtk_remote_submissions_total";
}

pub fn record_dispatch(mode: ExecutionMode) {
    counter!(names::JOBS_DISPATCHED_TOTAL, "mode" => mode.as_str()).increment(1);
}

pub fn record_rejection() {
    counter!(names::JOBS_REJECTED_TOTAL).increment(1);
}

/// Record a finished unit of work.
pub fn record_completion(endpoint: &str, code: u16, run_secs: f64) {
    let labels = [("endpoint", endpoint.to_string())];
    if code == 200 {
        counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
    } else {
        counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
    }
    histogram!(names::JOB_RUN_SECONDS, &labels).record(run_secs);
}

pub fn set_queue_length(len: usize) {
    gauge!(names::QUEUE_LENGTH).set(len as f64);
}

pub fn record_submission(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(names::REMOTE_SUBMISSIONS_TOTAL, "result" => result).increment(1);
}
