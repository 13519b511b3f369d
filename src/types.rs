//! Core types for videodl

use crate::config::Config;
use crate::utils::{BYTES_MB, format_mib};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Unique identifier for a job (also names its working directory)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub uuid::Uuid);

impl JobId {
    /// Create a fresh random JobId
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Job stage, ordered by progression. `Failed` sorts last so a failure is
/// always accepted as the newest stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Metadata-only query
    Probing,
    /// Media transfer in progress
    Downloading,
    /// Merge, remux or transcode
    Postprocessing,
    /// Final file is ready
    Done,
    /// Terminal failure
    Failed,
}

impl Stage {
    /// Lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Probing => "probing",
            Stage::Downloading => "downloading",
            Stage::Postprocessing => "postprocessing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    /// Whether no further samples are expected after this stage
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

/// Point-in-time copy of a job's progress.
///
/// Produced by the worker, copied out by the orchestrator on each poll and
/// never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Current stage
    pub stage: Option<Stage>,
    /// Bytes transferred so far for the current file
    pub downloaded_bytes: u64,
    /// Total size if the tool knows or estimates it
    pub total_bytes: Option<u64>,
    /// Transfer rate in bytes per second
    pub speed_bps: Option<f64>,
    /// Estimated time remaining
    pub eta: Option<Duration>,
    /// Name of the file currently being written
    pub filename: Option<String>,
    /// Post-processing step name (e.g. "Merger", "ffmpeg")
    pub postprocessor: Option<String>,
    /// Free-form status reported during post-processing
    pub status: Option<String>,
}

impl ProgressSnapshot {
    /// Snapshot for a stage with no numeric detail
    pub fn stage(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }

    /// Stage of this snapshot, `Probing` if unset
    pub fn current_stage(&self) -> Stage {
        self.stage.unwrap_or(Stage::Probing)
    }

    /// Percent complete in `0.0..=100.0`, `None` when the total is unknown
    pub fn percent(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.downloaded_bytes as f64 / total as f64 * 100.0).clamp(0.0, 100.0))
            }
            _ => None,
        }
    }
}

/// Per-request options, resolved from [`Config`] before a job starts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Format selection string
    pub format: String,
    /// Merge container for separate audio/video streams
    pub merge_output_format: String,
    /// Cookie file handed to the extraction tool
    pub cookie_file: Option<PathBuf>,
    /// Overall job timeout
    pub timeout: Duration,
    /// Retry count for the tool's internal retry logic
    pub retries: u32,
    /// Per-connection socket timeout for the tool
    pub socket_timeout: Duration,
    /// Prefer IPv6 transport
    pub force_ipv6: bool,
    /// Verbose tool output
    pub verbose: bool,
}

impl JobOptions {
    /// Resolve options from the process-wide configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            format: config.tools.format.clone(),
            merge_output_format: config.tools.merge_output_format.clone(),
            cookie_file: config.tools.cookie_file.clone(),
            timeout: config.job.timeout,
            retries: config.tools.retries,
            socket_timeout: config.tools.socket_timeout,
            force_ipv6: config.tools.force_ipv6,
            verbose: config.debug,
        }
    }

    /// Override the format selection
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Override the job timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Metadata returned by the probe
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Source id as reported by the extractor
    pub id: Option<String>,
    /// Human-readable title
    pub title: Option<String>,
    /// Extractor name (e.g. "youtube", "instagram")
    pub extractor: Option<String>,
    /// Declared size in bytes, often absent for adaptive formats
    pub declared_size: Option<u64>,
    /// Video codec of the selected format(s)
    pub vcodec: Option<String>,
    /// Audio codec of the selected format(s)
    pub acodec: Option<String>,
    /// Video width in pixels
    pub width: Option<u32>,
    /// Video height in pixels
    pub height: Option<u32>,
    /// Duration in seconds
    pub duration_secs: Option<f64>,
    /// Extension of the selected format
    pub ext: Option<String>,
}

impl MediaInfo {
    /// Title or a generic fallback
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Unknown")
    }
}

/// Successful worker output: the final file inside the job's working directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedMedia {
    /// Path to the final (possibly converted) file
    pub path: PathBuf,
    /// Size on disk in bytes
    pub size: u64,
    /// Whether the conversion tool produced this file
    pub converted: bool,
}

/// Materialized delivery returned to the caller after a successful job
#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    /// Small enough to send through the chat directly
    Inline {
        /// File contents
        bytes: Vec<u8>,
        /// File name to present
        file_name: String,
        /// Size in bytes
        size: u64,
        /// Probe metadata for the caption
        info: MediaInfo,
    },
    /// Uploaded to offload storage
    Offload {
        /// Public reference (download link)
        reference: String,
        /// Size in bytes
        size: u64,
        /// Probe metadata for the caption
        info: MediaInfo,
    },
}

impl Delivery {
    /// Size of the delivered file in bytes
    pub fn size(&self) -> u64 {
        match self {
            Delivery::Inline { size, .. } | Delivery::Offload { size, .. } => *size,
        }
    }

    /// Caption for the terminal chat message
    pub fn caption(&self, source_url: &str) -> String {
        match self {
            Delivery::Inline { info, .. } => {
                format!("Title: {}\nSource: {}", info.display_title(), source_url)
            }
            Delivery::Offload {
                reference,
                size,
                info,
            } => format!(
                "Title: {}\nSize: {}MB (too large for chat)\nDownload: {}\nSource: {}",
                info.display_title(),
                size / BYTES_MB,
                reference,
                source_url
            ),
        }
    }
}

impl std::fmt::Display for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delivery::Inline { file_name, size, .. } => {
                write!(f, "inline {} ({})", file_name, format_mib(*size))
            }
            Delivery::Offload {
                reference, size, ..
            } => write!(f, "offload {} ({})", reference, format_mib(*size)),
        }
    }
}
