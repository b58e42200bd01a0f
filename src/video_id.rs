#![forbid(unsafe_code)]

//! YouTube video id validation and extraction.

use std::sync::LazyLock;

use regex::Regex;

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z_-]{11}$").expect("valid video id regex"));

// Checked in order; each pattern captures the id in group 1. The host must
// start the input (after an optional scheme) and may only carry subdomains.
static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(?:https?://)?(?:[0-9a-zA-Z-]+\.)*youtube\.com/watch\?(?:[^#]*&)?v=([0-9a-zA-Z_-]{11})(?:[&#]|$)",
        r"^(?:https?://)?(?:www\.)?youtu\.be/([0-9a-zA-Z_-]{11})(?:[?&#/]|$)",
        r"^(?:https?://)?(?:[0-9a-zA-Z-]+\.)*youtube\.com/shorts/([0-9a-zA-Z_-]{11})(?:[?&#/]|$)",
        r"^(?:https?://)?(?:[0-9a-zA-Z-]+\.)*youtube\.com/embed/([0-9a-zA-Z_-]{11})(?:[?&#/]|$)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid video url regex"))
    .collect()
});

/// Returns true for the exact 11-character token YouTube uses as a video id.
pub fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID.is_match(id)
}

/// Pulls the video id out of a bare id or one of the usual YouTube URL
/// shapes (`watch?v=`, `youtu.be/`, `shorts/`, `embed/`).
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if is_valid_video_id(input) {
        return Some(input.to_string());
    }

    URL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(input))
        .map(|caps| caps[1].to_string())
}
