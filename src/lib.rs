#![forbid(unsafe_code)]

//! Helpers for cutting clips out of YouTube videos.
//!
//! Nothing here downloads or transcodes anything by itself: [`command`] turns
//! a clip request into the `yt-dlp` + `ffmpeg` lines to paste into a shell,
//! and [`details`] looks up the title, author and thumbnail of a video through
//! the public noembed API.

pub mod command;
pub mod config;
pub mod details;
pub mod video_id;
