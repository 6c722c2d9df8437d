//! Media processing for the toolkit operations.
//!
//! Thin async wrappers around the FFmpeg and FFprobe CLIs plus the helpers
//! the operations share:
//! - Remote file download into a per-job workspace
//! - Video/audio looping with the concat demuxer
//! - Audio track replacement
//! - Frame and thumbnail extraction
//! - ASS caption generation and burn-in

pub mod captions;
pub mod command;
pub mod download;
pub mod error;
pub mod frame;
pub mod looping;
pub mod mux;
pub mod probe;
pub mod workspace;

pub use captions::{
    burn_subtitles, write_captions, CaptionPosition, CaptionSettings, CaptionStyle, Replacement,
    TextAlignment, TimeRange, DEFAULT_PLAY_RES,
};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use download::Downloader;
pub use error::{MediaError, MediaResult};
pub use frame::{extract_frame, extract_thumbnail, FramePosition};
pub use looping::{loop_media, MAX_LOOP_COUNT};
pub use mux::replace_audio;
pub use probe::{get_duration, probe_media, MediaInfo};
pub use workspace::JobWorkspace;
