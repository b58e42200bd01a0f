#![forbid(unsafe_code)]

//! Builds the two shell lines that cut a clip out of a YouTube video: a
//! `yt-dlp` download into a working file followed by an `ffmpeg` trim into the
//! final, human-readable filename.
//!
//! Everything in here is pure string formatting. The lines are meant to be
//! pasted into a shell (or handed verbatim to a process runner), so the final
//! filename comes back already wrapped in single quotes.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_YTDLP_BIN: &str = "yt-dlp";
pub const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";

// Characters that are either illegal in filenames on some platform or would
// break the single-quoted shell argument.
const UNSAFE_FILENAME_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '\'', '<', '>'];

/// A user-selected range of a video plus the output format preference.
///
/// Every field that generation needs is optional so partially filled forms
/// (or JSON payloads) can be passed through as-is; [`generate_command`]
/// simply yields `None` until the request is complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// Start of the clip in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    /// End of the clip in seconds. Must be strictly greater than `start`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    #[serde(default)]
    pub extract_audio: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ClipRequest {
    pub fn new(video_id: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            video_id: Some(video_id.into()),
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }
}

/// Program names used for the generated lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolNames {
    pub ytdlp: String,
    pub ffmpeg: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            ytdlp: DEFAULT_YTDLP_BIN.to_string(),
            ffmpeg: DEFAULT_FFMPEG_BIN.to_string(),
        }
    }
}

/// A single shell line. Arguments are stored exactly as they should appear
/// in the shell, quoting included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellCommand {
    fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// The download line followed by the trim line.
///
/// `Display` joins both with a newline, which is the form users copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipCommands {
    pub fetch: ShellCommand,
    pub trim: ShellCommand,
    /// File `yt-dlp` writes and `ffmpeg` reads.
    pub working_file: String,
    /// Quoted output filename passed to `ffmpeg`.
    pub output_file: String,
}

impl fmt::Display for ClipCommands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.fetch, self.trim)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandGenerator {
    tools: ToolNames,
}

impl CommandGenerator {
    pub fn new(tools: ToolNames) -> Self {
        Self { tools }
    }

    /// Returns `None` when the video id, start or end is missing, or when the
    /// range is empty, reversed or not made of finite numbers.
    pub fn generate(&self, request: &ClipRequest) -> Option<ClipCommands> {
        let video_id = request
            .video_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())?;
        let start = request.start?;
        let end = request.end?;
        if !is_valid_range(start, end) {
            return None;
        }

        Some(self.build(
            video_id,
            start,
            end,
            request.extract_audio,
            request.title.as_deref(),
        ))
    }

    fn build(
        &self,
        video_id: &str,
        start: f64,
        end: f64,
        extract_audio: bool,
        title: Option<&str>,
    ) -> ClipCommands {
        let download_ext = if extract_audio { ".opus" } else { ".webm" };
        let working_file = format!("{video_id}{download_ext}");
        let output_file = final_filename(video_id, start, end, extract_audio, title);
        let duration = end - start;

        // yt-dlp -x abc_012-DEF -o abc_012-DEF.opus
        let mut fetch = ShellCommand::new(&self.tools.ytdlp);
        if extract_audio {
            fetch.arg("-x");
        }
        fetch.arg(video_id).arg("-o").arg(working_file.as_str());

        // ffmpeg -ss 105 -i abc_012-DEF.webm -c copy -t 60 'abc_012-DEF (from 1:45 to 2:45).mp4'
        let mut trim = ShellCommand::new(&self.tools.ffmpeg);
        trim.arg("-ss")
            .arg(start.to_string())
            .arg("-i")
            .arg(working_file.as_str());
        if !extract_audio {
            // Stream copy; audio extraction has to re-encode opus into mp3.
            trim.arg("-c").arg("copy");
        }
        trim.arg("-t")
            .arg(duration.to_string())
            .arg(output_file.as_str());

        ClipCommands {
            fetch,
            trim,
            working_file,
            output_file,
        }
    }
}

/// Generates the commands with the default `yt-dlp`/`ffmpeg` program names.
pub fn generate_command(request: &ClipRequest) -> Option<ClipCommands> {
    CommandGenerator::default().generate(request)
}

fn is_valid_range(start: f64, end: f64) -> bool {
    start.is_finite() && end.is_finite() && start < end
}

/// Output filename for a clip, wrapped in single quotes so it can be used as
/// a shell argument without further escaping.
///
/// The sanitized title is used as base name when it leaves anything behind,
/// otherwise the video id.
pub fn final_filename(
    video_id: &str,
    start: f64,
    end: f64,
    extract_audio: bool,
    title: Option<&str>,
) -> String {
    let base_name = title
        .map(sanitize_filename)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| video_id.to_string());
    let extension = if extract_audio { "mp3" } else { "mp4" };
    format!(
        "'{base_name} (from {} to {}).{extension}'",
        format_timestamp(start),
        format_timestamp(end)
    )
}

/// Strips `/ \ ? % * : | " ' < >` and leaves every other character alone.
pub fn sanitize_filename(input: &str) -> String {
    input
        .chars()
        .filter(|c| !UNSAFE_FILENAME_CHARS.contains(c))
        .collect()
}

/// Formats seconds as `M:SS`, or `H:MM:SS` from one hour on. Fractions are
/// truncated, never rounded.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Parses plain seconds (`105`, `1.5`) or `M:SS` / `H:MM:SS` into seconds.
///
/// Only the last component may carry a fraction. Components after the first
/// must stay below 60.
pub fn parse_timestamp(input: &str) -> Option<f64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    let (last, leading) = parts.split_last()?;

    let seconds: f64 = last.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    if !leading.is_empty() && seconds >= 60.0 {
        return None;
    }

    let mut total: u64 = 0;
    for (index, part) in leading.iter().enumerate() {
        let value: u64 = part.parse().ok()?;
        if index > 0 && value >= 60 {
            return None;
        }
        total = total.checked_mul(60)?.checked_add(value)?;
    }

    Some(total as f64 * 60.0 + seconds)
}
