//! Job status lookup.

use axum::extract::{Path, State};
use axum::Json;
use mtk_models::{JobId, StatusEvent};
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Last recorded status event for a job.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusEvent>> {
    if !is_valid_job_id(&job_id) {
        return Err(ApiError::bad_request("Invalid job id"));
    }

    let job_id = JobId::from_string(job_id);
    let event = state.recorder.latest(&job_id).await.map_err(|e| {
        error!(job_id = %job_id, error = %e, "Failed to read job status");
        ApiError::internal("Failed to read job status")
    })?;

    event
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Job {} not found", job_id)))
}

fn is_valid_job_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_validation() {
        assert!(is_valid_job_id("3f2b9c1e-7d4a-4c2b-9e1f-0a1b2c3d4e5f"));
        assert!(!is_valid_job_id(""));
        assert!(!is_valid_job_id("../etc"));
        assert!(!is_valid_job_id(&"a".repeat(65)));
    }
}
