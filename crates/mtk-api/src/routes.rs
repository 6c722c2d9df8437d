//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{download_media, health, job_status, ready, submit};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, require_api_key, security_headers};
use crate::operations::{
    AddAudio, ExtractFrame, LoopAudio, LoopVideo, Operation, TextToSpeech, Thumbnail,
    TtsWithCaptions, VoiceCloning,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let operation_routes = Router::new()
        .route(LoopVideo::PATH, post(submit::<LoopVideo>))
        .route(LoopAudio::PATH, post(submit::<LoopAudio>))
        .route(AddAudio::PATH, post(submit::<AddAudio>))
        .route(ExtractFrame::PATH, post(submit::<ExtractFrame>))
        .route(Thumbnail::PATH, post(submit::<Thumbnail>))
        .route(TextToSpeech::PATH, post(submit::<TextToSpeech>))
        .route(VoiceCloning::PATH, post(submit::<VoiceCloning>))
        .route(TtsWithCaptions::PATH, post(submit::<TtsWithCaptions>));

    let job_routes = Router::new()
        .route("/v1/jobs/:job_id/status", get(job_status))
        .route("/v1/media/download/:filename", get(download_media));

    // Every /v1 route requires the API key when one is configured.
    let api_key = Arc::new(state.config.api_key.clone());
    let api_routes = Router::new()
        .merge(operation_routes)
        .merge(job_routes)
        .route_layer(middleware::from_fn_with_state(api_key, require_api_key));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
