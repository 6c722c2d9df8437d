//! Inference service HTTP client.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::{Device, SpeechConfig};
use crate::error::{SpeechError, SpeechResult};
use crate::model_cache::{ModelCache, ModelHandle};
use crate::types::{HealthResponse, LoadModelRequest, LoadModelResponse, SynthesisRequest};

/// Client for the text-to-speech service.
pub struct SpeechClient {
    http: Client,
    config: SpeechConfig,
    models: ModelCache,
}

impl SpeechClient {
    pub fn new(config: SpeechConfig) -> SpeechResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(SpeechError::Network)?;

        Ok(Self {
            http,
            config,
            models: ModelCache::new(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> SpeechResult<Self> {
        Self::new(SpeechConfig::from_env())
    }

    pub fn device(&self) -> Device {
        self.config.device
    }

    /// Check if the service is healthy.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.config.base_url);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<HealthResponse>().await {
                    Ok(health) => health.status == "healthy" || health.status == "ok",
                    Err(e) => {
                        warn!("TTS health response unreadable: {}", e);
                        false
                    }
                }
            }
            Ok(response) => {
                warn!("TTS service health check failed: {}", response.status());
                false
            }
            Err(e) => {
                warn!("TTS service health check error: {}", e);
                false
            }
        }
    }

    /// Model for the configured device, loading it on first use.
    pub async fn model(&self) -> SpeechResult<ModelHandle> {
        let device = self.config.device;
        self.models
            .get_or_load(device, || self.load_model(device))
            .await
    }

    async fn load_model(&self, device: Device) -> SpeechResult<ModelHandle> {
        let url = format!("{}/v1/models/load", self.config.base_url);
        debug!(device = %device, "Loading speech model");

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .json(&LoadModelRequest { device })
                    .send()
                    .await?;
                check_status(response).await
            })
            .await
            .map_err(|e| SpeechError::ModelLoad(e.to_string()))?;

        let body: LoadModelResponse = response.json().await?;
        Ok(ModelHandle {
            model_id: body.model_id,
            device,
        })
    }

    /// Synthesize `request` into a WAV file at `output`.
    pub async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> SpeechResult<PathBuf> {
        self.generate(request, None, output).await
    }

    /// Synthesize `request` in the voice of the `reference` recording.
    pub async fn clone_voice(
        &self,
        request: &SynthesisRequest,
        reference: &Path,
        output: &Path,
    ) -> SpeechResult<PathBuf> {
        let audio = tokio::fs::read(reference).await?;
        if audio.is_empty() {
            return Err(SpeechError::InvalidArgument(
                "reference audio is empty".to_string(),
            ));
        }
        self.generate(request, Some(audio), output).await
    }

    async fn generate(
        &self,
        request: &SynthesisRequest,
        reference: Option<Vec<u8>>,
        output: &Path,
    ) -> SpeechResult<PathBuf> {
        request.validate()?;
        let model = self.model().await?;
        let url = format!("{}/v1/tts", self.config.base_url);
        let started = Instant::now();
        let cloning = reference.is_some();

        info!(
            model_type = %request.model_type,
            language = %request.language,
            cloning,
            chars = request.text.chars().count(),
            "Generating speech"
        );

        let build_form = || -> SpeechResult<Form> {
            let mut form = Form::new()
                .text("model_id", model.model_id.clone())
                .text("model_type", request.model_type.as_str())
                .text("text", request.text.clone())
                .text("exaggeration", request.emotion_intensity.to_string());
            if let Some(language) = request.language_hint() {
                form = form.text("language", language.to_string());
            }
            if let Some(audio) = reference.as_ref() {
                let part = Part::bytes(audio.clone())
                    .file_name("reference.wav")
                    .mime_str("audio/wav")?;
                form = form.part("reference_audio", part);
            }
            Ok(form)
        };

        let response = self
            .with_retry(|| async {
                let response = self.http.post(&url).multipart(build_form()?).send().await?;
                check_status(response).await
            })
            .await;

        let response = match response {
            Err(SpeechError::RequestFailed(msg)) if msg.starts_with("404") => {
                // Service restarted and no longer knows the model
                self.models.evict(model.device).await;
                return Err(SpeechError::RequestFailed(msg));
            }
            other => other?,
        };

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SpeechError::InvalidResponse(
                "TTS service returned no audio".to_string(),
            ));
        }
        tokio::fs::write(output, &audio).await?;

        metrics::histogram!("mtk_tts_duration_seconds", "cloning" => cloning.to_string())
            .record(started.elapsed().as_secs_f64());
        info!(bytes = audio.len(), "Speech written to {}", output.display());
        Ok(output.to_path_buf())
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> SpeechResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = SpeechResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "TTS request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn check_status(response: reqwest::Response) -> SpeechResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::BAD_GATEWAY {
        return Err(SpeechError::ServiceUnavailable(format!("{}: {}", status.as_u16(), body)));
    }
    Err(SpeechError::RequestFailed(format!("{}: {}", status.as_u16(), body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelType;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SpeechClient {
        SpeechClient::new(SpeechConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            device: Device::Cpu,
            max_retries: 1,
        })
        .unwrap()
    }

    async fn mount_load(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/models/load"))
            .and(body_json(json!({"device": "cpu"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"model_id": "tts-cpu"})))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_synthesize_loads_model_once() {
        let server = MockServer::start().await;
        mount_load(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/tts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFWAVE".to_vec()))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client(&server);
        let mut request = SynthesisRequest::new("Hallo Welt");
        request.model_type = ModelType::Multilingual;
        request.language = "de".into();

        let first = client.synthesize(&request, &dir.path().join("a.wav")).await.unwrap();
        client.synthesize(&request, &dir.path().join("b.wav")).await.unwrap();

        assert_eq!(std::fs::read(first).unwrap(), b"RIFFWAVE");
        assert_eq!(client.model().await.unwrap().model_id, "tts-cpu");
    }

    #[tokio::test]
    async fn test_clone_voice_sends_reference() {
        let server = MockServer::start().await;
        mount_load(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/tts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"CLONED".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("ref.wav");
        std::fs::write(&reference, b"voice").unwrap();

        let out = client(&server)
            .clone_voice(&SynthesisRequest::new("hi"), &reference, &dir.path().join("out.wav"))
            .await
            .unwrap();
        assert_eq!(std::fs::read(out).unwrap(), b"CLONED");

        let requests = server.received_requests().await.unwrap();
        let tts = requests.iter().find(|r| r.url.path() == "/v1/tts").unwrap();
        let body = String::from_utf8_lossy(&tts.body);
        assert!(body.contains("name=\"reference_audio\""));
        assert!(!body.contains("name=\"language\""));
    }

    #[tokio::test]
    async fn test_service_error_surfaces() {
        let server = MockServer::start().await;
        mount_load(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/tts"))
            .respond_with(ResponseTemplate::new(500).set_body_string("CUDA out of memory"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = client(&server)
            .synthesize(&SynthesisRequest::new("hi"), &dir.path().join("x.wav"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("CUDA out of memory"));
    }

    #[tokio::test]
    async fn test_invalid_request_skips_service() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let err = client(&server)
            .synthesize(&SynthesisRequest::new(""), &dir.path().join("x.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::InvalidArgument(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
