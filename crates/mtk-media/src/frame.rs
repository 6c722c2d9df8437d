//! Still frame extraction.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::get_duration;

/// Distance from either end of the clip where frames are taken.
pub const EDGE_OFFSET_SECS: f64 = 0.1;

/// Which frame to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePosition {
    #[default]
    First,
    Middle,
    Last,
}

impl FramePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Middle => "middle",
            Self::Last => "last",
        }
    }

    /// Seek position for a clip of `duration` seconds.
    pub fn timestamp(&self, duration: f64) -> f64 {
        match self {
            Self::First => EDGE_OFFSET_SECS,
            Self::Middle => duration / 2.0,
            Self::Last => last_frame_timestamp(duration),
        }
    }
}

impl fmt::Display for FramePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FramePosition {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "middle" => Ok(Self::Middle),
            "last" => Ok(Self::Last),
            other => Err(MediaError::invalid_argument(format!(
                "position must be first, middle or last, got '{}'",
                other
            ))),
        }
    }
}

fn last_frame_timestamp(duration: f64) -> f64 {
    (duration - EDGE_OFFSET_SECS).max(0.0)
}

/// Command writing the frame at `second` as a JPEG.
pub fn frame_command(input: &Path, output: &Path, second: f64) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .seek(second)
        .single_frame()
        .output_format("image2")
        .video_codec("mjpeg")
}

/// Extract the first, middle or last frame of a video.
pub async fn extract_frame(
    runner: &FfmpegRunner,
    input: &Path,
    output: &Path,
    position: FramePosition,
) -> MediaResult<f64> {
    let duration = match position {
        FramePosition::First => 0.0,
        _ => get_duration(input).await?,
    };
    let second = position.timestamp(duration);
    debug!(%position, duration, second, "Extracting frame");

    runner.run(&frame_command(input, output, second)).await?;
    Ok(second)
}

/// Extract a thumbnail at `second`; a negative value means the last frame.
pub async fn extract_thumbnail(
    runner: &FfmpegRunner,
    input: &Path,
    output: &Path,
    second: f64,
) -> MediaResult<f64> {
    let second = if second < 0.0 {
        last_frame_timestamp(get_duration(input).await?)
    } else {
        second
    };

    let cmd = FfmpegCommand::new(input, output).seek(second).single_frame();
    runner.run(&cmd).await?;
    Ok(second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_timestamps() {
        assert_eq!(FramePosition::First.timestamp(10.0), 0.1);
        assert_eq!(FramePosition::Middle.timestamp(10.0), 5.0);
        assert!((FramePosition::Last.timestamp(10.0) - 9.9).abs() < 1e-9);
        assert_eq!(FramePosition::Last.timestamp(0.05), 0.0);
    }

    #[test]
    fn test_position_parse() {
        assert_eq!("middle".parse::<FramePosition>().unwrap(), FramePosition::Middle);
        assert!("center".parse::<FramePosition>().is_err());
        let pos: FramePosition = serde_json::from_str("\"last\"").unwrap();
        assert_eq!(pos, FramePosition::Last);
    }

    #[test]
    fn test_frame_command_args() {
        let args = frame_command(Path::new("v.mp4"), Path::new("f.jpg"), 5.0).build_args();
        assert_eq!(
            args.join(" "),
            "-y -v error -ss 5.000 -i v.mp4 -vframes 1 -f image2 -c:v mjpeg f.jpg"
        );
    }
}
