//! Repeat a clip end to end with the concat demuxer.

use std::path::Path;

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

pub const MAX_LOOP_COUNT: u32 = 100;

/// Concat list repeating `input` `count` times.
pub fn concat_list(input: &Path, count: u32) -> String {
    // Single quotes inside the path are closed, escaped and reopened
    let escaped = input.to_string_lossy().replace('\'', "'\\''");
    (0..count)
        .map(|_| format!("file '{}'\n", escaped))
        .collect()
}

fn same_extension(a: &Path, b: &Path) -> bool {
    match (a.extension(), b.extension()) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => false,
    }
}

/// Repeat `input` `count` times into `output`.
///
/// Streams are copied when the container stays the same. Audio looped into
/// an `.mp3` from another format is encoded to MP3.
pub async fn loop_media(
    runner: &FfmpegRunner,
    input: &Path,
    output: &Path,
    count: u32,
) -> MediaResult<()> {
    if !(1..=MAX_LOOP_COUNT).contains(&count) {
        return Err(MediaError::invalid_argument(format!(
            "loop_count must be between 1 and {}",
            MAX_LOOP_COUNT
        )));
    }

    let input = tokio::fs::canonicalize(input).await?;
    let list = output.with_extension("concat.txt");
    tokio::fs::write(&list, concat_list(&input, count)).await?;

    let cmd = FfmpegCommand::new(&list, output)
        .input_format("concat")
        .input_arg("-safe")
        .input_arg("0");
    let is_mp3 = output
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3"));
    let cmd = if is_mp3 && !same_extension(&input, output) {
        cmd.output_arg("-vn")
            .audio_codec("libmp3lame")
            .output_args(["-q:a", "2"])
    } else {
        cmd.stream_copy()
    };
    let result = runner.run(&cmd).await;
    let _ = tokio::fs::remove_file(&list).await;
    result?;

    info!(count, "Looped {} into {}", input.display(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_repeats() {
        let list = concat_list(Path::new("/w/in.mp4"), 3);
        assert_eq!(list, "file '/w/in.mp4'\n".repeat(3));
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(Path::new("/w/it's.wav"), 1);
        assert_eq!(list, "file '/w/it'\\''s.wav'\n");
    }

    #[test]
    fn test_same_extension() {
        assert!(same_extension(Path::new("a.MP3"), Path::new("b.mp3")));
        assert!(!same_extension(Path::new("a.wav"), Path::new("b.mp3")));
        assert!(!same_extension(Path::new("a"), Path::new("b.mp3")));
    }

    #[tokio::test]
    async fn test_loop_count_bounds() {
        let runner = FfmpegRunner::new();
        let err = loop_media(&runner, Path::new("in.mp4"), Path::new("out.mp4"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidArgument(_)));

        let err = loop_media(&runner, Path::new("in.mp4"), Path::new("out.mp4"), 101)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidArgument(_)));
    }
}
