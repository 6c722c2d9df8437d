//! Cloud Run Jobs trigger.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mtk_dispatch::{JobTrigger, TriggerRequest, TriggerResponse, TriggerResult};
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::config::CloudRunConfig;
use crate::error::{CloudRunError, CloudRunResult};
use crate::token::{AccessTokenSource, TokenCache};
use crate::types::{ErrorResponse, Operation, RunJobRequest};

/// Starts executions of an existing Cloud Run Job.
///
/// Each trigger is a single `jobs.run` call; a rejected submission is
/// reported back and never retried. An expired token is refreshed once.
#[derive(Clone)]
pub struct CloudRunJobTrigger {
    http: Client,
    api_url: String,
    project_id: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl CloudRunJobTrigger {
    pub fn new(
        config: &CloudRunConfig,
        project_id: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> CloudRunResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("mtk-cloudrun/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            tokens,
        })
    }

    /// Create a trigger using application default credentials.
    pub async fn from_env() -> CloudRunResult<Self> {
        let config = CloudRunConfig::from_env();
        let auth = gcp_auth::provider()
            .await
            .map_err(|e| CloudRunError::auth_error(format!("No GCP credentials: {}", e)))?;

        let project_id = match config.project_id.clone() {
            Some(project_id) => project_id,
            None => auth
                .project_id()
                .await
                .map_err(|e| {
                    CloudRunError::auth_error(format!(
                        "GCP_PROJECT_ID not set and not available from credentials: {}",
                        e
                    ))
                })?
                .to_string(),
        };

        info!(project_id = %project_id, "Cloud Run job trigger configured");
        Self::new(&config, project_id, Arc::new(TokenCache::new(auth)))
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn run_url(&self, location: &str, job_name: &str) -> String {
        format!(
            "{}/v2/projects/{}/locations/{}/jobs/{}:run",
            self.api_url, self.project_id, location, job_name
        )
    }

    async fn post_run(&self, url: &str, body: &RunJobRequest) -> CloudRunResult<reqwest::Response> {
        let token = self.tokens.access_token().await?;
        Ok(self.http.post(url).bearer_auth(token).json(body).send().await?)
    }

    /// Submit one execution and return the operation.
    pub async fn run_job(&self, request: &TriggerRequest) -> CloudRunResult<Operation> {
        let url = self.run_url(&request.location, &request.job_name);
        let body = RunJobRequest::from(request);
        let started = Instant::now();

        let mut response = self.post_run(&url, &body).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Cloud Run rejected token, refreshing");
            self.tokens.invalidate().await;
            response = self.post_run(&url, &body).await?;
        }

        let status = response.status();
        metrics::histogram!("mtk_cloudrun_request_seconds", "status" => status.as_u16().to_string())
            .record(started.elapsed().as_secs_f64());

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(CloudRunError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let operation: Operation = response.json().await?;
        if let Some(error) = operation.error.as_ref() {
            return Err(CloudRunError::Api {
                status: 500,
                message: error.message.clone(),
            });
        }
        Ok(operation)
    }
}

#[async_trait]
impl JobTrigger for CloudRunJobTrigger {
    async fn trigger(&self, request: &TriggerRequest) -> TriggerResult<TriggerResponse> {
        let operation = self.run_job(request).await?;
        let execution_name = operation.execution_name();

        info!(
            job_name = %request.job_name,
            location = %request.location,
            execution = execution_name.as_deref().unwrap_or("unknown"),
            "Cloud Run job execution started"
        );

        Ok(TriggerResponse {
            job_submitted: true,
            execution_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::StaticToken;
    use mtk_dispatch::{RemoteJob, TriggerError};
    use mtk_models::JobPayload;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> JobPayload {
        JobPayload::from_value(json!({
            "video_url": "https://x/v.mp4",
            "webhook_url": "https://cb"
        }))
        .unwrap()
    }

    fn trigger(server: &MockServer) -> CloudRunJobTrigger {
        let config = CloudRunConfig {
            api_url: server.uri(),
            ..Default::default()
        };
        CloudRunJobTrigger::new(&config, "proj", Arc::new(StaticToken("tok".into()))).unwrap()
    }

    fn request() -> TriggerRequest {
        let job = RemoteJob {
            name: "media-job".into(),
            location: "us-central1".into(),
        };
        TriggerRequest::for_job(&job, "/v1/video/loop", &payload())
    }

    #[tokio::test]
    async fn test_trigger_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/projects/proj/locations/us-central1/jobs/media-job:run"))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(json!({"overrides": {"taskCount": 1}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/proj/locations/us-central1/operations/op-1",
                "metadata": {
                    "@type": "type.googleapis.com/google.cloud.run.v2.Execution",
                    "name": "projects/proj/locations/us-central1/jobs/media-job/executions/media-job-q2w9z"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = trigger(&server).trigger(&request()).await.unwrap();
        assert!(response.job_submitted);
        assert_eq!(response.short_handle(), "media-job-q2w9z");
    }

    #[tokio::test]
    async fn test_trigger_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "Permission 'run.jobs.run' denied", "status": "PERMISSION_DENIED"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = trigger(&server).trigger(&request()).await.unwrap_err();
        match err {
            TriggerError::Api { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("run.jobs.run"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
