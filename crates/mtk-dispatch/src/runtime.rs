//! Process-wide execution context, read once at startup.

use mtk_models::QueueCapacity;

/// Fallback handle when a delegated execution has no execution name.
pub const DEFAULT_EXECUTION_HANDLE: &str = "gcp_job";

const DEFAULT_JOB_LOCATION: &str = "us-central1";

/// Remote job used for delegation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteJob {
    pub name: String,
    pub location: String,
}

/// Request handed to a delegated execution through its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedRequest {
    /// Route path of the operation (`GCP_JOB_PATH`)
    pub path: String,
    /// Serialized JSON payload (`GCP_JOB_PAYLOAD`)
    pub payload: String,
}

/// Environment signals that decide how requests are executed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeContext {
    /// Execution handle when this process is itself a delegated execution
    pub delegated_execution: Option<String>,
    /// The job to run in place, when delegated
    pub delegated_request: Option<DelegatedRequest>,
    /// Remote job to delegate webhook requests to
    pub remote_job: Option<RemoteJob>,
    /// Maximum queued entries; 0 means unbounded
    pub max_queue_length: usize,
}

impl RuntimeContext {
    /// Read the context from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the context from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let delegated_execution = non_empty("CLOUD_RUN_JOB").map(|_| {
            non_empty("CLOUD_RUN_EXECUTION").unwrap_or_else(|| DEFAULT_EXECUTION_HANDLE.to_string())
        });

        let delegated_request = match (non_empty("GCP_JOB_PATH"), lookup("GCP_JOB_PAYLOAD")) {
            (Some(path), Some(payload)) if delegated_execution.is_some() => {
                Some(DelegatedRequest { path, payload })
            }
            _ => None,
        };

        let remote_job = non_empty("GCP_JOB_NAME").map(|name| RemoteJob {
            name,
            location: non_empty("GCP_JOB_LOCATION")
                .unwrap_or_else(|| DEFAULT_JOB_LOCATION.to_string()),
        });

        let max_queue_length = lookup("MAX_QUEUE_LENGTH")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);

        Self {
            delegated_execution,
            delegated_request,
            remote_job,
            max_queue_length,
        }
    }

    pub fn is_delegated(&self) -> bool {
        self.delegated_execution.is_some()
    }

    pub fn capacity(&self) -> QueueCapacity {
        QueueCapacity::from_max(self.max_queue_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn context(vars: &[(&str, &str)]) -> RuntimeContext {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeContext::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let ctx = context(&[]);
        assert!(!ctx.is_delegated());
        assert!(ctx.remote_job.is_none());
        assert_eq!(ctx.capacity(), QueueCapacity::Unlimited);
    }

    #[test]
    fn test_delegated_execution_handle() {
        let ctx = context(&[("CLOUD_RUN_JOB", "media-job"), ("CLOUD_RUN_EXECUTION", "exec-42")]);
        assert_eq!(ctx.delegated_execution.as_deref(), Some("exec-42"));

        let ctx = context(&[("CLOUD_RUN_JOB", "media-job")]);
        assert_eq!(ctx.delegated_execution.as_deref(), Some("gcp_job"));
    }

    #[test]
    fn test_delegated_request_requires_delegation() {
        let vars = [("GCP_JOB_PATH", "/v1/video/loop"), ("GCP_JOB_PAYLOAD", "{}")];
        assert!(context(&vars).delegated_request.is_none());

        let ctx = context(&[
            ("CLOUD_RUN_JOB", "media-job"),
            ("GCP_JOB_PATH", "/v1/video/loop"),
            ("GCP_JOB_PAYLOAD", "{}"),
        ]);
        assert_eq!(ctx.delegated_request.unwrap().path, "/v1/video/loop");
    }

    #[test]
    fn test_remote_job_location_default() {
        let ctx = context(&[("GCP_JOB_NAME", "media-job")]);
        assert_eq!(
            ctx.remote_job,
            Some(RemoteJob {
                name: "media-job".into(),
                location: "us-central1".into()
            })
        );
    }

    #[test]
    fn test_max_queue_length() {
        assert_eq!(context(&[("MAX_QUEUE_LENGTH", "2")]).capacity(), QueueCapacity::Limited(2));
        assert_eq!(context(&[("MAX_QUEUE_LENGTH", "junk")]).max_queue_length, 0);
    }
}
