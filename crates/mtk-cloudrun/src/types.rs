//! Cloud Run Admin API v2 wire types.

use mtk_dispatch::{JobOverrides, TriggerRequest};
use serde::{Deserialize, Serialize};

/// Body of `jobs.run`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunJobRequest {
    pub overrides: Overrides,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overrides {
    pub container_overrides: Vec<ContainerOverride>,
    pub task_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerOverride {
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl From<&JobOverrides> for RunJobRequest {
    fn from(overrides: &JobOverrides) -> Self {
        Self {
            overrides: Overrides {
                container_overrides: vec![ContainerOverride {
                    env: overrides
                        .env
                        .iter()
                        .map(|e| EnvVar {
                            name: e.name.clone(),
                            value: e.value.clone(),
                        })
                        .collect(),
                }],
                task_count: overrides.task_count,
            },
        }
    }
}

impl From<&TriggerRequest> for RunJobRequest {
    fn from(request: &TriggerRequest) -> Self {
        Self::from(&request.overrides)
    }
}

/// Long-running operation returned by `jobs.run`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Option<ExecutionMetadata>,
    #[serde(default)]
    pub error: Option<Status>,
}

impl Operation {
    /// Execution resource name, falling back to the operation name.
    pub fn execution_name(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.clone())
            .or_else(|| self.name.clone())
    }
}

/// Execution resource carried as operation metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionMetadata {
    #[serde(default)]
    pub name: Option<String>,
}

/// `google.rpc.Status`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Error body of a failed API call.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: Status,
}
