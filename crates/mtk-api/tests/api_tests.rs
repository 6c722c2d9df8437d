//! Router tests against in-memory sinks and a fake unit of work.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use mtk_api::{create_router, ApiConfig, AppState, OperationRegistry};
use mtk_dispatch::{Dispatcher, RuntimeContext, UnitOfWork, Worker};
use mtk_models::{JobId, JobPayload, TaskOutcome};
use mtk_notify::{HttpWebhookNotifier, MemoryStatusRecorder, StatusRecorder, WebhookConfig};
use mtk_speech::{SpeechClient, SpeechConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const API_KEY: &str = "test-key";

/// Stands in for the video loop operation without touching FFmpeg.
struct FakeLoop;

#[async_trait]
impl UnitOfWork for FakeLoop {
    fn endpoint(&self) -> &str {
        "/v1/video/loop"
    }

    async fn run(&self, job_id: &JobId, _payload: &JobPayload) -> TaskOutcome {
        TaskOutcome::success(self.endpoint(), format!("file:///artifacts/{}_looped.mp4", job_id))
    }
}

struct TestApp {
    router: Router,
    recorder: Arc<MemoryStatusRecorder>,
    storage: TempDir,
    // Keeps the queue open; never spawned, so queued entries stay queued.
    _worker: Worker,
}

fn app_with(api_key: Option<&str>, context: RuntimeContext) -> TestApp {
    let storage = tempfile::tempdir().unwrap();
    let config = ApiConfig {
        api_key: api_key.map(str::to_string),
        local_storage_path: storage.path().to_path_buf(),
        build_number: "test-build".to_string(),
        ..ApiConfig::default()
    };

    let recorder = Arc::new(MemoryStatusRecorder::new());
    let notifier = Arc::new(HttpWebhookNotifier::new(WebhookConfig::default()).unwrap());
    let (dispatcher, worker) = Dispatcher::with_worker(
        context,
        Arc::clone(&recorder) as Arc<dyn StatusRecorder>,
        notifier,
        None,
        config.build_number.clone(),
    );

    let mut operations = OperationRegistry::new();
    operations.register(Arc::new(FakeLoop));

    let state = AppState {
        config,
        dispatcher: Arc::new(dispatcher),
        recorder: Arc::clone(&recorder) as Arc<dyn StatusRecorder>,
        operations: Arc::new(operations),
        speech: Arc::new(SpeechClient::new(SpeechConfig::default()).unwrap()),
    };

    TestApp {
        router: create_router(state, None),
        recorder,
        storage,
        _worker: worker,
    }
}

fn app() -> TestApp {
    app_with(Some(API_KEY), RuntimeContext::default())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-API-Key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-API-Key", API_KEY)
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

// ============================================================================
// Public routes
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header("X-Request-ID", "req-42")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_missing_api_key_is_401() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/video/loop")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"video_url": "https://cdn.example/a.mp4", "loop_count": 2}).to_string()))
        .unwrap();

    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().contains("X-API-Key"));
    assert!(app.recorder.job_ids().await.is_empty());
}

#[tokio::test]
async fn test_wrong_api_key_is_401() {
    let app = app();
    let request = Request::builder()
        .uri("/v1/jobs/abc/status")
        .header("X-API-Key", "nope")
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_no_configured_key_allows_requests() {
    let app = app_with(None, RuntimeContext::default());
    let request = Request::builder()
        .method("POST")
        .uri("/v1/video/loop")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"video_url": "https://cdn.example/a.mp4", "loop_count": 2}).to_string()))
        .unwrap();

    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Operation submission
// ============================================================================

#[tokio::test]
async fn test_inline_loop_without_webhook() {
    let app = app();

    let (status, body) = send(
        &app.router,
        post_json(
            "/v1/video/loop",
            json!({"video_url": "https://cdn.example/a.mp4", "loop_count": 5, "id": "req-1"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(body["id"], "req-1");
    assert_eq!(body["endpoint"], "/v1/video/loop");
    assert_eq!(body["queue_time"], 0.0);
    assert_eq!(body["build_number"], "test-build");
    let job_id = body["job_id"].as_str().unwrap();
    assert_eq!(
        body["response"],
        format!("file:///artifacts/{}_looped.mp4", job_id)
    );
}

#[tokio::test]
async fn test_unknown_field_is_400() {
    let app = app();

    let (status, body) = send(
        &app.router,
        post_json(
            "/v1/video/loop",
            json!({"video_url": "https://cdn.example/a.mp4", "loop_count": 2, "speed": 3}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("speed"));
}

#[tokio::test]
async fn test_out_of_range_loop_count_is_400() {
    let app = app();

    let (status, _) = send(
        &app.router,
        post_json(
            "/v1/video/loop",
            json!({"video_url": "https://cdn.example/a.mp4", "loop_count": 101}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.recorder.job_ids().await.is_empty());
}

#[tokio::test]
async fn test_non_object_body_is_400() {
    let app = app();

    let (status, _) = send(&app.router, post_json("/v1/video/loop", json!([1, 2, 3]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unregistered_operation_is_404() {
    let app = app();

    let (status, _) = send(
        &app.router,
        post_json("/v1/audio/loop", json!({"audio_url": "https://cdn.example/a.mp3", "loop_count": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_request_is_queued_then_rejected_when_full() {
    let context = RuntimeContext {
        max_queue_length: 1,
        ..RuntimeContext::default()
    };
    let app = app_with(Some(API_KEY), context);
    let body = json!({
        "video_url": "https://cdn.example/a.mp4",
        "loop_count": 2,
        "webhook_url": "https://hooks.invalid/cb"
    });

    let (status, accepted) = send(&app.router, post_json("/v1/video/loop", body.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(accepted["message"], "processing");
    assert_eq!(accepted["queue_length"], 1);

    let (status, rejected) = send(&app.router, post_json("/v1/video/loop", body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(rejected["code"], 429);
}

// ============================================================================
// Job status
// ============================================================================

#[tokio::test]
async fn test_job_status_after_inline_run() {
    let app = app();
    let (_, body) = send(
        &app.router,
        post_json(
            "/v1/video/loop",
            json!({"video_url": "https://cdn.example/a.mp4", "loop_count": 1}),
        ),
    )
    .await;
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let (status, event) = send(&app.router, get(&format!("/v1/jobs/{}/status", job_id))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["job_status"], "done");
    assert_eq!(event["job_id"], job_id.as_str());
    assert_eq!(event["response"]["code"], 200);
}

#[tokio::test]
async fn test_unknown_job_status_is_404() {
    let app = app();
    let (status, _) = send(&app.router, get("/v1/jobs/does-not-exist/status")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Media download
// ============================================================================

#[tokio::test]
async fn test_download_serves_stored_file() {
    let app = app();
    std::fs::write(app.storage.path().join("job-1_looped.mp4"), b"video-bytes").unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get("/v1/media/download/job-1_looped.mp4"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"job-1_looped.mp4\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"video-bytes");
}

#[tokio::test]
async fn test_download_rejects_traversal() {
    let app = app();

    let (status, _) = send(&app.router, get("/v1/media/download/..%2F..%2Fetc%2Fpasswd")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app.router, get("/v1/media/download/.env")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_missing_file_is_404() {
    let app = app();
    let (status, _) = send(&app.router, get("/v1/media/download/missing.mp4")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recorder_sees_inline_lifecycle() {
    let app = app();
    let (_, body) = send(
        &app.router,
        post_json(
            "/v1/video/loop",
            json!({"video_url": "https://cdn.example/a.mp4", "loop_count": 3}),
        ),
    )
    .await;

    let job_id = JobId::from_string(body["job_id"].as_str().unwrap());
    let latest = tokio_test::assert_ok!(app.recorder.latest(&job_id).await);
    assert!(latest.is_some());
}
