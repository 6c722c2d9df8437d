//! Remote job trigger contract.

use async_trait::async_trait;
use mtk_models::JobPayload;
use serde::{Deserialize, Serialize};

use crate::error::TriggerResult;
use crate::runtime::{RemoteJob, DEFAULT_EXECUTION_HANDLE};

/// Environment variable passed to the remote execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvOverride {
    pub name: String,
    pub value: String,
}

/// Per-execution overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOverrides {
    pub env: Vec<EnvOverride>,
    pub task_count: u32,
}

/// A request to start one remote execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub job_name: String,
    pub location: String,
    pub overrides: JobOverrides,
}

impl TriggerRequest {
    /// Carry the request path and payload to the remote execution.
    pub fn for_job(job: &RemoteJob, path: &str, payload: &JobPayload) -> Self {
        Self {
            job_name: job.name.clone(),
            location: job.location.clone(),
            overrides: JobOverrides {
                env: vec![
                    EnvOverride {
                        name: "GCP_JOB_PATH".to_string(),
                        value: path.to_string(),
                    },
                    EnvOverride {
                        name: "GCP_JOB_PAYLOAD".to_string(),
                        value: payload.to_json_string(),
                    },
                ],
                task_count: 1,
            },
        }
    }
}

/// Result of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerResponse {
    pub job_submitted: bool,
    /// Full execution resource name, when reported
    pub execution_name: Option<String>,
}

impl TriggerResponse {
    /// Last path segment of the execution name.
    pub fn short_handle(&self) -> String {
        self.execution_name
            .as_deref()
            .and_then(|name| name.rsplit('/').next())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_EXECUTION_HANDLE)
            .to_string()
    }
}

/// Submits units of work to a remote serverless execution environment.
#[async_trait]
pub trait JobTrigger: Send + Sync {
    async fn trigger(&self, request: &TriggerRequest) -> TriggerResult<TriggerResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_carries_path_and_payload() {
        let job = RemoteJob {
            name: "media-job".into(),
            location: "us-central1".into(),
        };
        let payload = JobPayload::from_value(json!({"webhook_url": "https://cb"})).unwrap();
        let request = TriggerRequest::for_job(&job, "/v1/video/loop", &payload);

        assert_eq!(request.overrides.task_count, 1);
        assert_eq!(request.overrides.env[0].value, "/v1/video/loop");
        let sent: serde_json::Value =
            serde_json::from_str(&request.overrides.env[1].value).unwrap();
        assert_eq!(sent["webhook_url"], "https://cb");
    }

    #[test]
    fn test_short_handle() {
        let response = TriggerResponse {
            job_submitted: true,
            execution_name: Some("projects/p/locations/l/jobs/j/executions/j-abc12".into()),
        };
        assert_eq!(response.short_handle(), "j-abc12");
        assert_eq!(TriggerResponse::default().short_handle(), "gcp_job");
    }
}
