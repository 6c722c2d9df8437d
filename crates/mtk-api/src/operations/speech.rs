//! Text-to-speech and voice cloning.

use std::path::PathBuf;

use async_trait::async_trait;
use mtk_speech::{ModelType, SynthesisRequest};
use serde::Deserialize;
use validator::Validate;

use super::{validate_source_url, validate_webhook_url, JobScope, Operation, Toolkit};
use crate::error::JobResult;

pub(crate) fn default_language() -> String {
    "en".to_string()
}

fn default_intensity() -> f64 {
    1.0
}

pub(crate) fn multilingual() -> ModelType {
    ModelType::Multilingual
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TextToSpeechRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    #[serde(default = "default_language")]
    #[validate(length(min = 2, max = 16))]
    pub language: String,
    #[serde(default)]
    pub model_type: ModelType,
    #[serde(default = "default_intensity")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub emotion_intensity: f64,
    #[validate(custom(function = "validate_webhook_url"))]
    pub webhook_url: Option<String>,
    pub id: Option<String>,
}

impl TextToSpeechRequest {
    fn synthesis(&self) -> SynthesisRequest {
        SynthesisRequest {
            text: self.text.clone(),
            language: self.language.clone(),
            model_type: self.model_type,
            emotion_intensity: self.emotion_intensity,
        }
    }
}

/// Synthesize speech into a WAV file.
pub struct TextToSpeech;

#[async_trait]
impl Operation for TextToSpeech {
    type Request = TextToSpeechRequest;
    const PATH: &'static str = "/v1/chatterbox/text-to-speech";
    const NAME: &'static str = "text_to_speech";

    async fn execute(
        &self,
        toolkit: &Toolkit,
        scope: &JobScope,
        request: TextToSpeechRequest,
    ) -> JobResult<PathBuf> {
        let output = scope.output("speech", "wav");
        scope.logger.step(&format!(
            "Synthesizing {} characters with the {} model",
            request.text.chars().count(),
            request.model_type
        ));
        toolkit.speech.synthesize(&request.synthesis(), &output).await?;
        Ok(output)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct VoiceCloningRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    #[validate(custom(function = "validate_source_url"))]
    pub voice_audio_url: String,
    #[serde(default = "default_language")]
    #[validate(length(min = 2, max = 16))]
    pub language: String,
    #[serde(default = "multilingual")]
    pub model_type: ModelType,
    #[serde(default = "default_intensity")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub emotion_intensity: f64,
    #[validate(custom(function = "validate_webhook_url"))]
    pub webhook_url: Option<String>,
    pub id: Option<String>,
}

/// Synthesize speech in the voice of a reference recording.
pub struct VoiceCloning;

#[async_trait]
impl Operation for VoiceCloning {
    type Request = VoiceCloningRequest;
    const PATH: &'static str = "/v1/chatterbox/voice-cloning";
    const NAME: &'static str = "voice_cloning";

    async fn execute(
        &self,
        toolkit: &Toolkit,
        scope: &JobScope,
        request: VoiceCloningRequest,
    ) -> JobResult<PathBuf> {
        let reference = toolkit
            .fetch(scope, &request.voice_audio_url, "voice", "wav")
            .await?;
        let output = scope.output("cloned", "wav");

        let synthesis = SynthesisRequest {
            text: request.text,
            language: request.language,
            model_type: request.model_type,
            emotion_intensity: request.emotion_intensity,
        };
        scope.logger.step("Cloning voice");
        toolkit
            .speech
            .clone_voice(&synthesis, &reference, &output)
            .await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tts_defaults() {
        let request: TextToSpeechRequest =
            serde_json::from_value(json!({"text": "Hello there"})).unwrap();

        assert_eq!(request.language, "en");
        assert_eq!(request.model_type, ModelType::English);
        assert_eq!(request.emotion_intensity, 1.0);
        assert!(request.validate().is_ok());
        assert_eq!(request.synthesis().language_hint(), None);
    }

    #[test]
    fn test_voice_cloning_defaults_to_multilingual() {
        let request: VoiceCloningRequest = serde_json::from_value(json!({
            "text": "Hallo",
            "voice_audio_url": "https://cdn.example/voice.wav"
        }))
        .unwrap();
        assert_eq!(request.model_type, ModelType::Multilingual);
    }

    #[test]
    fn test_tts_bounds() {
        let empty: TextToSpeechRequest = serde_json::from_value(json!({"text": ""})).unwrap();
        assert!(empty.validate().is_err());

        let long: TextToSpeechRequest =
            serde_json::from_value(json!({"text": "a".repeat(5001)})).unwrap();
        assert!(long.validate().is_err());

        let loud: TextToSpeechRequest =
            serde_json::from_value(json!({"text": "hi", "emotion_intensity": 2.5})).unwrap();
        assert!(loud.validate().is_err());
    }

    #[test]
    fn test_unknown_model_type_rejected() {
        let result =
            serde_json::from_value::<TextToSpeechRequest>(json!({"text": "hi", "model_type": "turbo"}));
        assert!(result.is_err());
    }
}
