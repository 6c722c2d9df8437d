//! Narrated video with burned-in captions.

use std::borrow::Cow;
use std::path::PathBuf;

use async_trait::async_trait;
use mtk_media::{
    burn_subtitles, get_duration, probe_media, replace_audio, write_captions, CaptionSettings,
    Replacement, TimeRange, DEFAULT_PLAY_RES,
};
use mtk_speech::{ModelType, SynthesisRequest};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::speech::multilingual;
use super::{validate_source_url, validate_webhook_url, JobScope, Operation, Toolkit};
use crate::error::{JobError, JobResult};

fn default_language() -> String {
    "de".to_string()
}

fn default_intensity() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_caption_request"))]
pub struct TtsWithCaptionsRequest {
    #[validate(custom(function = "validate_source_url"))]
    pub video_url: String,
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    #[serde(default = "default_language")]
    #[validate(length(min = 2, max = 16))]
    pub language: String,
    #[serde(default = "default_intensity")]
    #[validate(range(min = 0.25, max = 2.0))]
    pub emotion_intensity: f64,
    #[serde(default = "multilingual")]
    pub model_type: ModelType,
    pub caption_settings: Option<CaptionSettings>,
    /// Substitutions applied to the caption text only
    #[serde(default)]
    pub replace: Vec<Replacement>,
    /// Intervals left without captions
    #[serde(default)]
    pub exclude_time_ranges: Vec<TimeRange>,
    #[validate(custom(function = "validate_webhook_url"))]
    pub webhook_url: Option<String>,
    pub id: Option<String>,
}

fn validate_caption_request(request: &TtsWithCaptionsRequest) -> Result<(), ValidationError> {
    if let Some(settings) = &request.caption_settings {
        if let Err(e) = settings.validate() {
            let mut error = ValidationError::new("caption_settings");
            error.message = Some(Cow::Owned(e.to_string()));
            return Err(error);
        }
    }
    if request.replace.iter().any(|r| r.find.is_empty()) {
        return Err(ValidationError::new("replace_find_empty"));
    }
    if request.exclude_time_ranges.iter().any(|r| r.end <= r.start) {
        return Err(ValidationError::new("exclude_time_range_order"));
    }
    Ok(())
}

/// Speak `text` over a video and caption it word by word.
///
/// The speech replaces the video's soundtrack and the captions are timed
/// across the speech duration, then rendered into the picture.
pub struct TtsWithCaptions;

#[async_trait]
impl Operation for TtsWithCaptions {
    type Request = TtsWithCaptionsRequest;
    const PATH: &'static str = "/v1/video/add-tts-with-captions";
    const NAME: &'static str = "tts_with_captions";

    async fn execute(
        &self,
        toolkit: &Toolkit,
        scope: &JobScope,
        request: TtsWithCaptionsRequest,
    ) -> JobResult<PathBuf> {
        let synthesis = SynthesisRequest {
            text: request.text.clone(),
            language: request.language.clone(),
            model_type: request.model_type,
            emotion_intensity: request.emotion_intensity,
        };
        let speech = scope.file("speech.wav");

        scope.logger.step("Synthesizing narration");
        let (video, _) = tokio::try_join!(
            toolkit.fetch(scope, &request.video_url, "video", "mp4"),
            async {
                toolkit.speech.synthesize(&synthesis, &speech).await?;
                Ok::<_, JobError>(())
            },
        )?;

        let narrated = scope.file("narrated.mp4");
        scope.logger.step("Replacing soundtrack");
        replace_audio(&toolkit.ffmpeg, &video, &speech, &narrated).await?;

        let duration = get_duration(&speech).await?;
        let info = probe_media(&video).await?;
        let play_res = if info.width > 0 && info.height > 0 {
            (info.width, info.height)
        } else {
            scope
                .logger
                .fallback("Video has no frame size, using the default caption canvas");
            DEFAULT_PLAY_RES
        };

        let settings = request.caption_settings.unwrap_or_default();
        let subtitles = scope.file("captions.ass");
        let lines = write_captions(
            &subtitles,
            &request.text,
            duration,
            &settings,
            &request.replace,
            &request.exclude_time_ranges,
            play_res,
        )
        .await?;
        scope.logger.step(&format!(
            "Wrote {} caption lines over {:.2}s",
            lines, duration
        ));

        let output = scope.output("final", "mp4");
        scope.logger.step("Burning captions");
        burn_subtitles(&toolkit.ffmpeg, &narrated, &subtitles, &output).await?;
        Ok(output)
    }
}
