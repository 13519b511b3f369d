//! Trait for media conversion

use super::codecs::ConversionPlan;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Trait for re-encoding a downloaded file into a chat-compatible one
///
/// Implementations run on the job's worker thread, so the interface is
/// blocking. A long conversion must check `cancel` and stop early when the
/// job has been abandoned.
///
/// # Examples
///
/// ```no_run
/// use videodl::conversion::{ConversionPlan, FfmpegConverter, MediaConverter};
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = FfmpegConverter::from_path().expect("ffmpeg not found");
/// let plan = ConversionPlan::for_codecs(Some("vp9"), Some("opus"));
/// let out = converter.convert(
///     Path::new("video.webm"),
///     Path::new("video.converted.mp4"),
///     &plan,
///     &CancellationToken::new(),
/// )?;
/// println!("converted to {}", out.display());
/// # Ok(())
/// # }
/// ```
pub trait MediaConverter: Send + Sync {
    /// Convert `input` into `output` according to `plan`
    ///
    /// # Returns
    ///
    /// Path of the converted file (normally `output`)
    ///
    /// # Errors
    ///
    /// `Error::Conversion` if the tool is unavailable or fails,
    /// `Error::Cancelled` if `cancel` fired while converting
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        plan: &ConversionPlan,
        cancel: &CancellationToken,
    ) -> crate::Result<PathBuf>;

    /// Whether this implementation can actually convert
    fn is_available(&self) -> bool {
        true
    }

    /// Name of this implementation
    fn name(&self) -> &'static str;
}
