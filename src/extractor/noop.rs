//! No-op extractor for hosts without yt-dlp

use super::traits::{DownloadRequest, MediaExtractor};
use crate::types::{JobOptions, MediaInfo, ProgressSnapshot};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

const MISSING_TOOL: &str = "extraction requires the external yt-dlp binary. \
                            Configure tools.ytdlp_path or ensure yt-dlp is in PATH.";

/// Extractor used when no yt-dlp binary is available
///
/// Every job fails at the probe with a typed error instead of the process
/// refusing to start.
pub struct NoOpExtractor;

impl MediaExtractor for NoOpExtractor {
    fn probe(
        &self,
        _url: &str,
        _options: &JobOptions,
        _cancel: &CancellationToken,
    ) -> crate::Result<MediaInfo> {
        Err(crate::Error::MetadataProbeFailed(MISSING_TOOL.into()))
    }

    fn download(
        &self,
        _request: &DownloadRequest<'_>,
        _progress: &dyn Fn(ProgressSnapshot),
        _cancel: &CancellationToken,
    ) -> crate::Result<PathBuf> {
        Err(crate::Error::Extraction(MISSING_TOOL.into()))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
