//! ASS caption generation and burn-in.
//!
//! Captions are built from the spoken text rather than a transcript: each
//! word gets a slice of the audio duration proportional to its length, words
//! are grouped into lines, and each style renders those lines as ASS events.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Resolution used when the video size is unknown.
pub const DEFAULT_PLAY_RES: (u32, u32) = (1920, 1080);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionStyle {
    /// Whole line, no animation
    Classic,
    /// Line with words filling in as they are spoken
    #[default]
    Karaoke,
    /// Line with the current word recolored
    Highlight,
    /// Line with the current word underlined
    Underline,
    /// One word at a time
    WordByWord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionPosition {
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    TopLeft,
    TopCenter,
    TopRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlignment {
    Left,
    Center,
    Right,
}

impl CaptionPosition {
    /// ASS numpad alignment (1-3 bottom, 4-6 middle, 7-9 top).
    pub fn ass_alignment(&self, horizontal: Option<TextAlignment>) -> u8 {
        use CaptionPosition::*;
        let row_base = match self {
            BottomLeft | BottomCenter | BottomRight => 1,
            MiddleLeft | MiddleCenter | MiddleRight => 4,
            TopLeft | TopCenter | TopRight => 7,
        };
        let column = match horizontal {
            Some(TextAlignment::Left) => 0,
            Some(TextAlignment::Center) => 1,
            Some(TextAlignment::Right) => 2,
            None => match self {
                BottomLeft | MiddleLeft | TopLeft => 0,
                BottomCenter | MiddleCenter | TopCenter => 1,
                BottomRight | MiddleRight | TopRight => 2,
            },
        };
        row_base + column
    }
}

/// Caption appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionSettings {
    pub style: CaptionStyle,
    pub position: CaptionPosition,
    /// Overrides the horizontal part of `position`
    pub alignment: Option<TextAlignment>,
    pub line_color: String,
    pub word_color: String,
    pub outline_color: String,
    pub font_family: String,
    pub font_size: u32,
    pub bold: bool,
    pub italic: bool,
    pub outline_width: u32,
    pub shadow_offset: u32,
    pub all_caps: bool,
    pub max_words_per_line: usize,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            style: CaptionStyle::Karaoke,
            position: CaptionPosition::BottomCenter,
            alignment: Some(TextAlignment::Center),
            line_color: "#FFFFFF".to_string(),
            word_color: "#FFFF00".to_string(),
            outline_color: "#000000".to_string(),
            font_family: "Arial".to_string(),
            font_size: 32,
            bold: true,
            italic: false,
            outline_width: 3,
            shadow_offset: 0,
            all_caps: false,
            max_words_per_line: 4,
        }
    }
}

impl CaptionSettings {
    pub fn validate(&self) -> MediaResult<()> {
        for (field, value) in [
            ("line_color", &self.line_color),
            ("word_color", &self.word_color),
            ("outline_color", &self.outline_color),
        ] {
            if hex_to_ass_color(value).is_none() {
                return Err(MediaError::invalid_argument(format!(
                    "{} must be a #RRGGBB color, got '{}'",
                    field, value
                )));
            }
        }
        if !(8..=200).contains(&self.font_size) {
            return Err(MediaError::invalid_argument("font_size must be between 8 and 200"));
        }
        if !(1..=20).contains(&self.max_words_per_line) {
            return Err(MediaError::invalid_argument(
                "max_words_per_line must be between 1 and 20",
            ));
        }
        if self.font_family.trim().is_empty() || self.font_family.contains(',') {
            return Err(MediaError::invalid_argument("font_family is invalid"));
        }
        Ok(())
    }
}

/// Text substitution applied before captions are laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Replacement {
    pub find: String,
    pub replace: String,
}

/// Interval with no captions. Bounds are seconds or `[HH:]MM:SS[.fff]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeRange {
    #[serde(deserialize_with = "deserialize_time")]
    pub start: f64,
    #[serde(deserialize_with = "deserialize_time")]
    pub end: f64,
}

impl TimeRange {
    fn overlaps(&self, start: f64, end: f64) -> bool {
        start < self.end && end > self.start
    }
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(s) if s >= 0.0 => Ok(s),
        Raw::Seconds(s) => Err(serde::de::Error::custom(format!("negative time {}", s))),
        Raw::Text(t) => parse_timestamp(&t)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}'", t))),
    }
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS`, each with optional fraction.
pub fn parse_timestamp(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let mut seconds = 0.0;
    for part in &parts {
        let value: f64 = part.parse().ok()?;
        if value < 0.0 {
            return None;
        }
        seconds = seconds * 60.0 + value;
    }
    Some(seconds)
}

/// A spoken word and its time slot.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Split `text` into words spread over `duration` by character weight.
pub fn time_words(
    text: &str,
    duration: f64,
    replacements: &[Replacement],
    all_caps: bool,
) -> Vec<TimedWord> {
    let mut text = text.to_string();
    for r in replacements.iter().filter(|r| !r.find.is_empty()) {
        text = text.replace(&r.find, &r.replace);
    }
    if all_caps {
        text = text.to_uppercase();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    // Each word also carries the pause of the following space
    let weights: Vec<usize> = words.iter().map(|w| w.chars().count() + 1).collect();
    let total: usize = weights.iter().sum();
    if total == 0 || duration <= 0.0 {
        return Vec::new();
    }

    let mut elapsed = 0usize;
    words
        .iter()
        .zip(weights)
        .map(|(word, weight)| {
            let start = duration * elapsed as f64 / total as f64;
            elapsed += weight;
            let end = duration * elapsed as f64 / total as f64;
            TimedWord {
                text: word.to_string(),
                start,
                end,
            }
        })
        .collect()
}

/// Group words into lines, dropping words inside excluded ranges.
pub fn build_lines(
    words: Vec<TimedWord>,
    max_words_per_line: usize,
    exclude: &[TimeRange],
) -> Vec<Vec<TimedWord>> {
    let max = max_words_per_line.max(1);
    let mut lines = Vec::new();
    let mut current: Vec<TimedWord> = Vec::new();

    for word in words {
        if exclude.iter().any(|r| r.overlaps(word.start, word.end)) {
            // An excluded gap also ends the current line
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(word);
        if current.len() == max {
            lines.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// `#RRGGBB` to ASS `&H00BBGGRR`.
pub fn hex_to_ass_color(hex: &str) -> Option<String> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let (r, g, b) = (&hex[0..2], &hex[2..4], &hex[4..6]);
    Some(format!("&H00{}{}{}", b, g, r).to_uppercase())
}

/// ASS timestamp `H:MM:SS.cc`.
pub fn format_ass_time(seconds: f64) -> String {
    let cs = (seconds.max(0.0) * 100.0).round() as u64;
    format!(
        "{}:{:02}:{:02}.{:02}",
        cs / 360_000,
        (cs / 6000) % 60,
        (cs / 100) % 60,
        cs % 100
    )
}

fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
}

fn centiseconds(seconds: f64) -> u64 {
    (seconds.max(0.0) * 100.0).round() as u64
}

/// Render a complete ASS document.
pub fn render_ass(settings: &CaptionSettings, lines: &[Vec<TimedWord>], play_res: (u32, u32)) -> String {
    let line_color = hex_to_ass_color(&settings.line_color).unwrap_or_else(|| "&H00FFFFFF".into());
    let word_color = hex_to_ass_color(&settings.word_color).unwrap_or_else(|| "&H0000FFFF".into());
    let outline_color =
        hex_to_ass_color(&settings.outline_color).unwrap_or_else(|| "&H00000000".into());

    // Karaoke fills from secondary to primary as each word is reached
    let (primary, secondary) = match settings.style {
        CaptionStyle::Karaoke => (word_color.clone(), line_color.clone()),
        _ => (line_color.clone(), word_color.clone()),
    };
    let flag = |b: bool| if b { -1 } else { 0 };
    let (width, height) = play_res;

    let mut out = String::new();
    let _ = writeln!(out, "[Script Info]");
    let _ = writeln!(out, "ScriptType: v4.00+");
    let _ = writeln!(out, "PlayResX: {}", width);
    let _ = writeln!(out, "PlayResY: {}", height);
    let _ = writeln!(out, "WrapStyle: 0");
    let _ = writeln!(out, "ScaledBorderAndShadow: yes");
    let _ = writeln!(out);
    let _ = writeln!(out, "[V4+ Styles]");
    let _ = writeln!(
        out,
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
    );
    let _ = writeln!(
        out,
        "Style: Default,{},{},{},{},{},&H80000000,{},{},0,0,100,100,0,0,1,{},{},{},{},{},{},1",
        settings.font_family,
        settings.font_size,
        primary,
        secondary,
        outline_color,
        flag(settings.bold),
        flag(settings.italic),
        settings.outline_width,
        settings.shadow_offset,
        settings.position.ass_alignment(settings.alignment),
        width / 20,
        width / 20,
        height / 20,
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "[Events]");
    let _ = writeln!(
        out,
        "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
    );

    let mut dialogue = |start: f64, end: f64, text: &str| {
        let _ = writeln!(
            out,
            "Dialogue: 0,{},{},Default,,0,0,0,,{}",
            format_ass_time(start),
            format_ass_time(end),
            text
        );
    };

    for line in lines {
        let (Some(first), Some(last)) = (line.first(), line.last()) else {
            continue;
        };

        match settings.style {
            CaptionStyle::Classic => {
                let text = line.iter().map(|w| escape_text(&w.text)).collect::<Vec<_>>().join(" ");
                dialogue(first.start, last.end, &text);
            }
            CaptionStyle::Karaoke => {
                let mut text = String::new();
                let mut cursor = first.start;
                for (i, word) in line.iter().enumerate() {
                    let gap = centiseconds(word.start - cursor);
                    if gap > 0 {
                        let _ = write!(text, "{{\\k{}}}", gap);
                    }
                    if i > 0 {
                        text.push(' ');
                    }
                    let _ = write!(
                        text,
                        "{{\\k{}}}{}",
                        centiseconds(word.end - word.start),
                        escape_text(&word.text)
                    );
                    cursor = word.end;
                }
                dialogue(first.start, last.end, &text);
            }
            CaptionStyle::Highlight | CaptionStyle::Underline => {
                for (active, word) in line.iter().enumerate() {
                    let text = line
                        .iter()
                        .enumerate()
                        .map(|(i, w)| {
                            let escaped = escape_text(&w.text);
                            if i != active {
                                escaped
                            } else if settings.style == CaptionStyle::Highlight {
                                format!("{{\\c{}&}}{}{{\\r}}", word_color, escaped)
                            } else {
                                format!("{{\\u1}}{}{{\\u0}}", escaped)
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(" ");
                    dialogue(word.start, word.end, &text);
                }
            }
            CaptionStyle::WordByWord => {
                for word in line {
                    dialogue(word.start, word.end, &escape_text(&word.text));
                }
            }
        }
    }

    out
}

/// Write captions for `text` spoken over `duration` seconds to `path`.
pub async fn write_captions(
    path: &Path,
    text: &str,
    duration: f64,
    settings: &CaptionSettings,
    replacements: &[Replacement],
    exclude: &[TimeRange],
    play_res: (u32, u32),
) -> MediaResult<usize> {
    settings.validate()?;
    let words = time_words(text, duration, replacements, settings.all_caps);
    let lines = build_lines(words, settings.max_words_per_line, exclude);
    tokio::fs::write(path, render_ass(settings, &lines, play_res)).await?;
    Ok(lines.len())
}

/// Escape a path for use inside a filtergraph option value.
fn filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "'\\''")
}

/// Command rendering `subtitles` onto `input`, copying the audio.
pub fn burn_subtitles_command(input: &Path, subtitles: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .video_filter(format!("subtitles='{}'", filter_path(subtitles)))
        .audio_codec("copy")
}

pub async fn burn_subtitles(
    runner: &FfmpegRunner,
    input: &Path,
    subtitles: &Path,
    output: &Path,
) -> MediaResult<()> {
    runner.run(&burn_subtitles_command(input, subtitles, output)).await
}
