//! Media metadata probing
//!
//! Wraps the external `ffprobe` tool to read container durations, plus the
//! upload check that rejects over-long or unreadable videos.

pub mod ffprobe;
pub mod upload;

pub use ffprobe::{FFPROBE, MediaProbe, duration_args};
pub use upload::{is_video_path, validate_video_upload};
