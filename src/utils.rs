//! Utility functions for URL checks, naming and size formatting

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Bytes in one mebibyte
pub const BYTES_MB: u64 = 1_048_576;

/// Maximum number of characters of a title kept in a storage object name
const MAX_TITLE_CHARS: usize = 80;

/// Validate that `input` is an absolute http(s) URL with a host.
///
/// Surrounding whitespace is ignored.
///
/// # Examples
///
/// ```
/// use videodl::utils::validate_url;
///
/// assert!(validate_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").is_ok());
/// assert!(validate_url("ftp://example.com/video.mp4").is_err());
/// assert!(validate_url("not a url").is_err());
/// ```
pub fn validate_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).map_err(|e| Error::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidUrl {
            url: trimmed.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Build a unique storage object name for an offloaded file.
///
/// The name is `{uuid}_{title}.{ext}` where spaces in the title become
/// underscores and path separators are dropped.
pub fn storage_object_name(title: Option<&str>, extension: &str) -> String {
    let title = title.filter(|t| !t.trim().is_empty()).unwrap_or("video");
    let cleaned: String = title
        .trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '?' | '#' | '%' | '\0'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .take(MAX_TITLE_CHARS)
        .collect();
    let extension = extension.trim_start_matches('.');
    let extension = if extension.is_empty() { "mp4" } else { extension };

    format!("{}_{}.{}", uuid::Uuid::new_v4(), cleaned, extension)
}

/// Format a byte count as mebibytes with two decimals, e.g. `"12.50 MiB"`
#[must_use]
pub fn format_mib(bytes: u64) -> String {
    format!("{:.2} MiB", bytes as f64 / BYTES_MB as f64)
}

/// Size of a file on disk, mapped into the given error constructor on failure
pub(crate) fn file_size(path: &Path, map_err: impl FnOnce(String) -> Error) -> Result<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| map_err(format!("cannot stat {}: {}", path.display(), e)))
}

/// Find the largest regular file directly inside `dir`.
///
/// Used as a fallback when the extraction tool does not report its final path.
pub(crate) fn largest_file_in(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            meta.is_file().then(|| (meta.len(), entry.path()))
        })
        .filter(|(_, path)| !is_partial_download(path))
        .max_by_key(|(len, _)| *len)
        .map(|(_, path)| path)
}

/// Partial or fragment files left behind by the extraction tool
fn is_partial_download(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();
    name.ends_with(".part") || name.ends_with(".ytdl") || name.contains(".part-frag")
}
