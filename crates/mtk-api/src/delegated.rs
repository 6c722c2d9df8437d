//! Single-job entry for delegated executions.
//!
//! A remote job execution starts this binary with the route path and the
//! original request body in its environment. The job runs once through the
//! dispatcher, webhook included, and the process exit code reflects the
//! envelope.

use mtk_dispatch::DelegatedRequest;
use mtk_models::JobPayload;
use serde_json::Value;
use tracing::{error, info};

use crate::state::AppState;

/// Exit code for a delegated run: `0` when the job succeeded.
pub async fn run(state: &AppState, request: &DelegatedRequest) -> i32 {
    let Some(unit) = state.operations.get(&request.path) else {
        error!(path = %request.path, "No operation registered for delegated path");
        return 1;
    };

    let payload = match serde_json::from_str::<Value>(&request.payload)
        .map_err(|e| e.to_string())
        .and_then(|value| JobPayload::from_value(value).map_err(|e| e.to_string()))
    {
        Ok(payload) => payload,
        Err(e) => {
            error!(path = %request.path, error = %e, "Delegated payload is not a JSON object");
            return 1;
        }
    };

    info!(path = %request.path, "Running delegated job");
    let envelope = state.dispatcher.dispatch(unit, payload, false).await;

    let exit_code = if envelope.is_success() { 0 } else { 1 };
    info!(
        job_id = %envelope.job_id,
        code = envelope.code,
        message = %envelope.message,
        envelope = %envelope.to_value(),
        "Delegated job finished"
    );
    exit_code
}
