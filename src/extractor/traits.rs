//! Trait and request type for media extraction

use crate::types::{JobOptions, MediaInfo, ProgressSnapshot};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Everything the extractor needs for one download
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    /// Source URL
    pub url: &'a str,
    /// Directory the tool writes into; nothing is written outside it
    pub work_dir: &'a Path,
    /// Resolved job options
    pub options: &'a JobOptions,
}

/// Trait for fetching media from a source URL
///
/// Implementations wrap a third-party extraction tool. Both operations are
/// blocking: `probe` runs on the blocking pool, `download` on the job's
/// worker thread.
///
/// # Examples
///
/// ```no_run
/// use videodl::extractor::{DownloadRequest, MediaExtractor, YtDlpExtractor};
/// use videodl::{Config, JobOptions};
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = YtDlpExtractor::from_path().expect("yt-dlp not found");
/// let options = JobOptions::from_config(&Config::default());
///
/// let cancel = CancellationToken::new();
/// let info = extractor.probe("https://youtu.be/dQw4w9WgXcQ", &options, &cancel)?;
/// println!("{} ({:?} bytes)", info.display_title(), info.declared_size);
///
/// let request = DownloadRequest {
///     url: "https://youtu.be/dQw4w9WgXcQ",
///     work_dir: Path::new("/tmp/job"),
///     options: &options,
/// };
/// let path = extractor.download(&request, &|p| println!("{:?}", p.percent()), &cancel)?;
/// println!("saved to {}", path.display());
/// # Ok(())
/// # }
/// ```
pub trait MediaExtractor: Send + Sync {
    /// Metadata-only query; downloads no media content
    ///
    /// When `cancel` fires the implementation stops the tool and returns
    /// `Error::Cancelled`.
    ///
    /// # Errors
    ///
    /// `Error::UnsupportedSource` when no extractor handles the URL,
    /// `Error::Network` on transport failures, otherwise
    /// `Error::MetadataProbeFailed`
    fn probe(
        &self,
        url: &str,
        options: &JobOptions,
        cancel: &CancellationToken,
    ) -> crate::Result<MediaInfo>;

    /// Download the media into `request.work_dir`
    ///
    /// Every progress sample is passed to `progress` as soon as the tool
    /// reports it. When `cancel` fires the implementation stops the tool and
    /// returns `Error::Cancelled`.
    ///
    /// # Returns
    ///
    /// Path of the final file inside the working directory
    fn download(
        &self,
        request: &DownloadRequest<'_>,
        progress: &dyn Fn(ProgressSnapshot),
        cancel: &CancellationToken,
    ) -> crate::Result<PathBuf>;

    /// Whether this implementation can actually extract
    fn is_available(&self) -> bool {
        true
    }

    /// Name of this implementation
    fn name(&self) -> &'static str;
}
