//! Inference service request/response types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Device;
use crate::error::{SpeechError, SpeechResult};

pub const MAX_TEXT_CHARS: usize = 5000;
pub const MAX_EMOTION_INTENSITY: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    #[default]
    English,
    Multilingual,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::English => "english",
            ModelType::Multilingual => "multilingual",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text to synthesize and how.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub language: String,
    pub model_type: ModelType,
    /// Emotion exaggeration, 0.0 to 2.0
    pub emotion_intensity: f64,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: "en".to_string(),
            model_type: ModelType::English,
            emotion_intensity: 1.0,
        }
    }

    pub fn validate(&self) -> SpeechResult<()> {
        let chars = self.text.chars().count();
        if self.text.trim().is_empty() || chars > MAX_TEXT_CHARS {
            return Err(SpeechError::InvalidArgument(format!(
                "text must be between 1 and {} characters",
                MAX_TEXT_CHARS
            )));
        }
        if !(0.0..=MAX_EMOTION_INTENSITY).contains(&self.emotion_intensity) {
            return Err(SpeechError::InvalidArgument(format!(
                "emotion_intensity must be between 0 and {}",
                MAX_EMOTION_INTENSITY
            )));
        }
        Ok(())
    }

    /// Language hint, only honoured by the multilingual model.
    pub fn language_hint(&self) -> Option<&str> {
        match self.model_type {
            ModelType::Multilingual => Some(self.language.as_str()),
            ModelType::English => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoadModelRequest {
    pub device: Device,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoadModelResponse {
    pub model_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HealthResponse {
    pub status: String,
}
