//! Error types for videodl
//!
//! Every failure a job can end with is a variant of [`Error`]. Failures raised
//! inside the background worker are captured into the job's result slot and
//! handed back to the caller unchanged, so the type is `Clone` and carries
//! only owned, string-like context.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::utils::BYTES_MB;

/// Result type alias for videodl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for a single fetch job
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The submitted text is not an http(s) URL
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The rejected input
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The extraction tool has no extractor for this URL
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    /// The metadata-only probe failed
    #[error("metadata probe failed: {0}")]
    MetadataProbeFailed(String),

    /// Declared size exceeds the job ceiling; nothing was downloaded
    #[error("declared size {declared} bytes exceeds ceiling of {ceiling} bytes")]
    SizeRejectedPreflight {
        /// Size reported by the probe
        declared: u64,
        /// Configured absolute ceiling
        ceiling: u64,
    },

    /// Network failure reported by the extraction tool
    #[error("network error: {0}")]
    Network(String),

    /// Extraction tool error (non-zero exit, missing output, missing binary)
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Remux/transcode step failed
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// On-disk size exceeds the job ceiling after download/conversion
    #[error("file size {actual} bytes exceeds ceiling of {ceiling} bytes")]
    SizeRejectedPostflight {
        /// Size of the final file on disk
        actual: u64,
        /// Configured absolute ceiling
        ceiling: u64,
    },

    /// The job did not produce a result within the configured timeout
    #[error("job timed out after {}s", .after.as_secs())]
    Timeout {
        /// The configured timeout that elapsed
        after: Duration,
    },

    /// Upload to offload storage failed
    #[error("storage upload failed: {0}")]
    StorageUpload(String),

    /// Removing the job's working directory failed
    #[error("cleanup failed for {path}: {reason}")]
    Cleanup {
        /// The working directory that could not be removed
        path: PathBuf,
        /// The underlying I/O error
        reason: String,
    },

    /// The worker observed the abandon signal and stopped early
    #[error("job cancelled")]
    Cancelled,

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "limits.inline_limit_bytes")
        key: Option<String>,
    },
}

impl Error {
    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidUrl { .. } => "invalid_url",
            Error::UnsupportedSource(_) => "unsupported_source",
            Error::MetadataProbeFailed(_) => "metadata_probe_failed",
            Error::SizeRejectedPreflight { .. } => "size_rejected_preflight",
            Error::Network(_) => "network_failure",
            Error::Extraction(_) => "extraction_failure",
            Error::Conversion(_) => "conversion_failure",
            Error::SizeRejectedPostflight { .. } => "size_rejected_postflight",
            Error::Timeout { .. } => "timeout",
            Error::StorageUpload(_) => "storage_upload_failure",
            Error::Cleanup { .. } => "internal_cleanup_failure",
            Error::Cancelled => "cancelled",
            Error::Config { .. } => "config_error",
        }
    }

    /// Short text suitable as the single terminal chat message.
    ///
    /// Never includes tool output or paths.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidUrl { .. } => "Please provide a valid URL.".to_string(),
            Error::UnsupportedSource(_) => {
                "Sorry, this URL is not from a supported platform.".to_string()
            }
            Error::MetadataProbeFailed(_) => {
                "Sorry, I could not read information about this video.".to_string()
            }
            Error::SizeRejectedPreflight { declared, ceiling } => format!(
                "Sorry, the video is too large (size: {}MB, max: {}MB supported).",
                declared / BYTES_MB,
                ceiling / BYTES_MB
            ),
            Error::Network(_) => {
                "Sorry, a network error interrupted the download. Please try again later."
                    .to_string()
            }
            Error::Extraction(_) => "Sorry, there was an error downloading the video.".to_string(),
            Error::Conversion(_) => {
                "Sorry, the video could not be converted to a playable format.".to_string()
            }
            Error::SizeRejectedPostflight { actual, ceiling } => format!(
                "Sorry, the downloaded video is too large (size: {}MB, max: {}MB supported).",
                actual / BYTES_MB,
                ceiling / BYTES_MB
            ),
            Error::Timeout { .. } => "Sorry, the download took too long and was stopped.".to_string(),
            Error::StorageUpload(_) => {
                "Sorry, failed to upload the video to cloud storage.".to_string()
            }
            Error::Cleanup { .. } | Error::Cancelled | Error::Config { .. } => {
                "Sorry, an internal error occurred.".to_string()
            }
        }
    }

    /// Whether this failure was decided by size limits rather than a fault
    pub fn is_size_rejection(&self) -> bool {
        matches!(
            self,
            Error::SizeRejectedPreflight { .. } | Error::SizeRejectedPostflight { .. }
        )
    }
}
