//! Operation submission.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mtk_models::JobPayload;
use serde_json::Value;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::operations::Operation;
use crate::state::AppState;

/// Validate the body against `O`'s request type and hand it to the dispatcher.
///
/// Everything past validation, including failures, is answered with the
/// dispatcher's envelope and its code as the HTTP status.
pub async fn submit<O: Operation>(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;
    let payload = JobPayload::from_value(value).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let request: O::Request = payload
        .decode()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    request.validate()?;

    let unit = state
        .operations
        .get(O::PATH)
        .ok_or_else(|| ApiError::not_found(format!("No operation registered for {}", O::PATH)))?;

    let envelope = state.dispatcher.dispatch(unit, payload, false).await;
    let status = StatusCode::from_u16(envelope.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((status, Json(envelope)).into_response())
}
