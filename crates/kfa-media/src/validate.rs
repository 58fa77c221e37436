//! Input checks performed before any upload.

use std::path::Path;

use tracing::warn;

use crate::error::{MediaError, MediaResult};

/// Container extensions the model provider accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp4", "mpeg", "mov", "avi", "flv", "mpg", "webm", "wmv", "3gpp", "mkv",
];

/// Hard cap on upload size: 2 GiB.
pub const MAX_FILE_SIZE_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Validate a video file for analysis.
///
/// Checks existence, extension, and the size cap. Returns the file size
/// in bytes so callers can reuse it without a second stat.
pub fn validate_video(path: impl AsRef<Path>) -> MediaResult<u64> {
    let path = path.as_ref();

    let metadata = std::fs::metadata(path).map_err(|_| {
        warn!("Video file not found: {}", path.display());
        MediaError::FileNotFound(path.to_path_buf())
    })?;

    let size = metadata.len();
    if size > MAX_FILE_SIZE_BYTES {
        warn!("Video file too large: {} bytes", size);
        return Err(MediaError::FileTooLarge {
            size,
            limit: MAX_FILE_SIZE_BYTES,
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        warn!("Unsupported format: .{}", ext);
        return Err(MediaError::UnsupportedFormat(ext));
    }

    Ok(size)
}
