//! Webhook delivery of final job envelopes.
//!
//! One POST per terminal event. Delivery is best-effort: failures are logged
//! and counted, never retried and never surfaced to the job.

use std::time::Duration;

use async_trait::async_trait;
use mtk_models::Envelope;
use tracing::{info, warn};

use crate::error::{NotifyError, NotifyResult};

/// Webhook client configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Timeout for a single delivery
    pub timeout: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl WebhookConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: std::env::var("WEBHOOK_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// Delivers envelopes to caller-supplied callback URLs.
#[async_trait]
pub trait WebhookNotifier: Send + Sync {
    /// POST the envelope to `url`. Never fails from the caller's view.
    async fn notify(&self, url: &str, envelope: &Envelope);
}

/// reqwest-backed webhook notifier.
pub struct HttpWebhookNotifier {
    client: reqwest::Client,
}

impl HttpWebhookNotifier {
    pub fn new(config: WebhookConfig) -> NotifyResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client })
    }

    async fn try_send(&self, url: &str, envelope: &Envelope) -> NotifyResult<()> {
        let response = self.client.post(url).json(envelope).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl WebhookNotifier for HttpWebhookNotifier {
    async fn notify(&self, url: &str, envelope: &Envelope) {
        match self.try_send(url, envelope).await {
            Ok(()) => {
                info!(job_id = %envelope.job_id, url, "Webhook delivered");
                metrics::counter!("mtk_webhook_deliveries_total", "result" => "success")
                    .increment(1);
            }
            Err(e) => {
                warn!(job_id = %envelope.job_id, url, error = %e, "Webhook delivery failed");
                metrics::counter!("mtk_webhook_deliveries_total", "result" => "failure")
                    .increment(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtk_models::JobId;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn envelope() -> Envelope {
        serde_json::from_value(json!({
            "code": 200,
            "id": "abc",
            "job_id": JobId::from_string("job-1"),
            "message": "success",
            "pid": 1,
            "queue_id": "q",
            "build_number": "1",
            "endpoint": "/v1/video/loop",
            "response": "https://cdn/out.mp4",
            "run_time": 1.0,
            "queue_time": 0.0,
            "total_time": 1.0
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_envelope_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cb"))
            .and(body_partial_json(json!({"job_id": "job-1", "code": 200})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = HttpWebhookNotifier::new(WebhookConfig::default()).unwrap();
        notifier
            .notify(&format!("{}/cb", server.uri()), &envelope())
            .await;
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        let notifier = HttpWebhookNotifier::new(WebhookConfig::default()).unwrap();
        notifier.notify(&server.uri(), &envelope()).await;

        assert!(matches!(
            notifier.try_send(&server.uri(), &envelope()).await,
            Err(NotifyError::HttpStatus(502))
        ));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(NotifyError::HttpStatus(502).to_string(), "Webhook returned HTTP 502");
    }
}
