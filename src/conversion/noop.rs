//! No-op converter for hosts without ffmpeg

use super::codecs::ConversionPlan;
use super::traits::MediaConverter;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Converter used when no ffmpeg binary is available
///
/// A file that needs no conversion never reaches a converter, so this only
/// runs for incompatible codecs and fails those jobs with a clear message.
pub struct NoOpConverter;

impl MediaConverter for NoOpConverter {
    fn convert(
        &self,
        _input: &Path,
        _output: &Path,
        _plan: &ConversionPlan,
        _cancel: &CancellationToken,
    ) -> crate::Result<PathBuf> {
        Err(crate::Error::Conversion(
            "conversion requires the external ffmpeg binary. \
             Configure tools.ffmpeg_path or ensure ffmpeg is in PATH."
                .into(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
