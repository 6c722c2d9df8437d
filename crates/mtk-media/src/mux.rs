//! Audio track replacement.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Command that keeps the video of `video` and takes audio from `audio`.
///
/// Video is copied, audio is encoded to AAC, and the output ends with the
/// shorter of the two.
pub fn replace_audio_command(video: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(video, output)
        .add_input(audio)
        .map("0:v:0")
        .map("1:a:0")
        .video_codec("copy")
        .audio_codec("aac")
        .shortest()
}

pub async fn replace_audio(
    runner: &FfmpegRunner,
    video: &Path,
    audio: &Path,
    output: &Path,
) -> MediaResult<()> {
    runner.run(&replace_audio_command(video, audio, output)).await
}
