//! Upload-time video checks
//!
//! A freshly saved upload that looks like a video is probed; anything that
//! cannot be probed or runs longer than the limit is deleted again.

use super::MediaProbe;
use crate::{Error, Result};
use std::path::Path;

const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "mov"];

/// Whether `path` has one of the accepted video extensions
pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Probe a saved video and enforce `max_seconds`.
///
/// Returns the duration when the upload is accepted. On any failure the
/// file at `path` is removed before the error is returned.
pub async fn validate_video_upload(
    probe: &MediaProbe,
    path: &Path,
    max_seconds: f64,
) -> Result<f64> {
    let outcome = match probe.duration_seconds(path).await {
        Ok(duration) if duration > max_seconds => Err(Error::VideoTooLong {
            duration,
            max: max_seconds,
        }),
        other => other,
    };

    if let Err(e) = &outcome {
        tracing::info!("Rejecting upload {}: {}", path.display(), e);
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            tracing::warn!(
                "Failed to remove rejected upload {}: {}",
                path.display(),
                remove_err
            );
        }
    }

    outcome
}
