//! CLI-based converter using the external ffmpeg binary

use super::codecs::ConversionPlan;
use super::traits::MediaConverter;
use crate::error::Error;
use crate::process::{collect_stream, join_collected, wait_or_kill};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Converter that shells out to `ffmpeg`
///
/// Streams the plan marks as compatible are copied, the rest are re-encoded
/// (video to H.264, audio to AAC). The output is an mp4 with the index moved
/// to the front so chat clients can start playback before the whole file
/// arrives.
pub struct FfmpegConverter {
    binary_path: PathBuf,
}

impl FfmpegConverter {
    /// Create a converter with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    /// Arguments passed to ffmpeg for one conversion
    pub fn build_args(input: &Path, output: &Path, plan: &ConversionPlan) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-map".to_string(),
            "0:v?".to_string(),
            "-map".to_string(),
            "0:a?".to_string(),
            "-c:v".to_string(),
            plan.video.ffmpeg_codec().to_string(),
            "-c:a".to_string(),
            plan.audio.ffmpeg_codec().to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            output.display().to_string(),
        ]
    }
}

impl MediaConverter for FfmpegConverter {
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        plan: &ConversionPlan,
        cancel: &CancellationToken,
    ) -> crate::Result<PathBuf> {
        let args = Self::build_args(input, output, plan);
        debug!(binary = %self.binary_path.display(), ?args, "running ffmpeg");

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Conversion(format!("failed to execute ffmpeg: {}", e)))?;

        let stderr = collect_stream(child.stderr.take());
        let status = wait_or_kill(&mut child, cancel)
            .map_err(|e| Error::Conversion(format!("failed to wait for ffmpeg: {}", e)))?;
        let diagnostics = join_collected(stderr);

        let Some(status) = status else {
            return Err(Error::Cancelled);
        };
        if !status.success() {
            let detail = diagnostics.trim();
            return Err(Error::Conversion(if detail.is_empty() {
                format!("ffmpeg exited with {}", status)
            } else {
                format!("ffmpeg exited with {}: {}", status, detail)
            }));
        }
        if !output.is_file() {
            return Err(Error::Conversion(format!(
                "ffmpeg reported success but '{}' was not written",
                output.display()
            )));
        }

        info!(
            input = %input.display(),
            output = %output.display(),
            video = plan.video.ffmpeg_codec(),
            audio = plan.audio.ffmpeg_codec(),
            "conversion finished"
        );
        Ok(output.to_path_buf())
    }

    fn name(&self) -> &'static str {
        "cli-ffmpeg"
    }
}
