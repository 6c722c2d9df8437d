//! Still frames from videos.

use std::path::PathBuf;

use async_trait::async_trait;
use mtk_media::{extract_frame, extract_thumbnail, FramePosition};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::{validate_source_url, validate_webhook_url, JobScope, Operation, Toolkit};
use crate::error::JobResult;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ExtractFrameRequest {
    #[validate(custom(function = "validate_source_url"))]
    pub video_url: String,
    #[serde(default)]
    pub position: FramePosition,
    #[validate(custom(function = "validate_webhook_url"))]
    pub webhook_url: Option<String>,
    pub id: Option<String>,
}

/// First, middle or last frame as a JPEG.
pub struct ExtractFrame;

#[async_trait]
impl Operation for ExtractFrame {
    type Request = ExtractFrameRequest;
    const PATH: &'static str = "/v1/video/extract-frame";
    const NAME: &'static str = "extract_frame";

    async fn execute(
        &self,
        toolkit: &Toolkit,
        scope: &JobScope,
        request: ExtractFrameRequest,
    ) -> JobResult<PathBuf> {
        let video = toolkit.fetch(scope, &request.video_url, "video", "mp4").await?;
        let output = scope.output(&format!("{}_frame", request.position), "jpg");

        let second = extract_frame(&toolkit.ffmpeg, &video, &output, request.position).await?;
        scope
            .logger
            .step(&format!("Extracted {} frame at {:.3}s", request.position, second));
        Ok(output)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ThumbnailRequest {
    #[validate(custom(function = "validate_source_url"))]
    pub video_url: String,
    /// Timestamp in seconds; `-1` takes the last frame
    #[serde(default)]
    #[validate(custom(function = "validate_second"))]
    pub second: f64,
    #[validate(custom(function = "validate_webhook_url"))]
    pub webhook_url: Option<String>,
    pub id: Option<String>,
}

fn validate_second(second: f64) -> Result<(), ValidationError> {
    if second.is_finite() && second >= -1.0 {
        Ok(())
    } else {
        Err(ValidationError::new("second"))
    }
}

/// One frame at an arbitrary timestamp.
pub struct Thumbnail;

#[async_trait]
impl Operation for Thumbnail {
    type Request = ThumbnailRequest;
    const PATH: &'static str = "/v1/video/thumbnail";
    const NAME: &'static str = "thumbnail";

    async fn execute(
        &self,
        toolkit: &Toolkit,
        scope: &JobScope,
        request: ThumbnailRequest,
    ) -> JobResult<PathBuf> {
        let video = toolkit.fetch(scope, &request.video_url, "video", "mp4").await?;
        let output = scope.output("thumbnail", "jpg");

        let second = extract_thumbnail(&toolkit.ffmpeg, &video, &output, request.second).await?;
        scope
            .logger
            .step(&format!("Extracted thumbnail at {:.3}s", second));
        Ok(output)
    }
}
