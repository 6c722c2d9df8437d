//! Looping and audio replacement.

use std::path::PathBuf;

use async_trait::async_trait;
use mtk_media::{loop_media, replace_audio};
use serde::Deserialize;
use validator::Validate;

use super::{validate_source_url, validate_webhook_url, JobScope, Operation, Toolkit};
use crate::error::JobResult;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoopVideoRequest {
    #[validate(custom(function = "validate_source_url"))]
    pub video_url: String,
    #[validate(range(min = 1, max = 100))]
    pub loop_count: u32,
    #[validate(custom(function = "validate_webhook_url"))]
    pub webhook_url: Option<String>,
    pub id: Option<String>,
}

/// Repeat a video `loop_count` times.
pub struct LoopVideo;

#[async_trait]
impl Operation for LoopVideo {
    type Request = LoopVideoRequest;
    const PATH: &'static str = "/v1/video/loop";
    const NAME: &'static str = "video_loop";

    async fn execute(
        &self,
        toolkit: &Toolkit,
        scope: &JobScope,
        request: LoopVideoRequest,
    ) -> JobResult<PathBuf> {
        let source = toolkit.fetch(scope, &request.video_url, "source", "mp4").await?;
        let output = scope.output("looped", "mp4");

        scope
            .logger
            .step(&format!("Looping video {} times", request.loop_count));
        loop_media(&toolkit.ffmpeg, &source, &output, request.loop_count).await?;
        Ok(output)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoopAudioRequest {
    #[validate(custom(function = "validate_source_url"))]
    pub audio_url: String,
    #[validate(range(min = 1, max = 100))]
    pub loop_count: u32,
    #[validate(custom(function = "validate_webhook_url"))]
    pub webhook_url: Option<String>,
    pub id: Option<String>,
}

/// Repeat an audio file `loop_count` times into an MP3.
pub struct LoopAudio;

#[async_trait]
impl Operation for LoopAudio {
    type Request = LoopAudioRequest;
    const PATH: &'static str = "/v1/audio/loop";
    const NAME: &'static str = "audio_loop";

    async fn execute(
        &self,
        toolkit: &Toolkit,
        scope: &JobScope,
        request: LoopAudioRequest,
    ) -> JobResult<PathBuf> {
        let source = toolkit.fetch(scope, &request.audio_url, "source", "mp3").await?;
        let output = scope.output("looped", "mp3");

        scope
            .logger
            .step(&format!("Looping audio {} times", request.loop_count));
        loop_media(&toolkit.ffmpeg, &source, &output, request.loop_count).await?;
        Ok(output)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AddAudioRequest {
    #[validate(custom(function = "validate_source_url"))]
    pub video_url: String,
    #[validate(custom(function = "validate_source_url"))]
    pub audio_url: String,
    #[validate(custom(function = "validate_webhook_url"))]
    pub webhook_url: Option<String>,
    pub id: Option<String>,
}

/// Replace a video's soundtrack, trimmed to the shorter stream.
pub struct AddAudio;

#[async_trait]
impl Operation for AddAudio {
    type Request = AddAudioRequest;
    const PATH: &'static str = "/v1/video/add_audio";
    const NAME: &'static str = "add_audio";

    async fn execute(
        &self,
        toolkit: &Toolkit,
        scope: &JobScope,
        request: AddAudioRequest,
    ) -> JobResult<PathBuf> {
        let (video, audio) = tokio::try_join!(
            toolkit.fetch(scope, &request.video_url, "video", "mp4"),
            toolkit.fetch(scope, &request.audio_url, "audio", "mp3"),
        )?;
        let output = scope.output("with_audio", "mp4");

        scope.logger.step("Muxing audio");
        replace_audio(&toolkit.ffmpeg, &video, &audio, &output).await?;
        Ok(output)
    }
}
