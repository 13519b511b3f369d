//! Worker body: download, verify, convert, then set the job result

use super::traits::{DownloadRequest, MediaExtractor};
use crate::conversion::{ConversionPlan, MediaConverter};
use crate::error::{Error, Result};
use crate::job::JobContext;
use crate::types::{DownloadedMedia, MediaInfo, ProgressSnapshot, Stage};
use crate::utils::{file_size, largest_file_in};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// File name of the conversion output inside the working directory
const CONVERTED_FILE_NAME: &str = "video.converted.mp4";

/// Drives one job from download to a terminal result.
///
/// [`run`](Self::run) never returns an error and never unwinds: every
/// outcome, including a panic inside the extractor or the abandon signal, is
/// written to the job's result slot.
#[derive(Clone)]
pub struct ExtractionAdapter {
    extractor: Arc<dyn MediaExtractor>,
    converter: Arc<dyn MediaConverter>,
    convert_extractors: Vec<String>,
}

impl ExtractionAdapter {
    /// Create an adapter
    ///
    /// `convert_extractors` restricts the codec table to media from these
    /// extractors; an empty list applies it to every extractor.
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        converter: Arc<dyn MediaConverter>,
        convert_extractors: Vec<String>,
    ) -> Self {
        Self {
            extractor,
            converter,
            convert_extractors,
        }
    }

    /// Run the job and set its result. `info` is the metadata from the probe.
    pub fn run(&self, ctx: &JobContext, info: &MediaInfo) {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.execute(ctx, info)))
            .unwrap_or_else(|payload| Err(Error::Extraction(panic_message(payload.as_ref()))));

        match &outcome {
            Ok(media) => {
                ctx.write_progress(ProgressSnapshot::stage(Stage::Done));
                info!(
                    job_id = %ctx.id(),
                    size = media.size,
                    converted = media.converted,
                    "download finished"
                );
            }
            Err(Error::Cancelled) => {
                ctx.write_progress(ProgressSnapshot::stage(Stage::Failed));
                debug!(job_id = %ctx.id(), "worker stopped after abandon signal");
            }
            Err(e) => {
                ctx.write_progress(ProgressSnapshot::stage(Stage::Failed));
                error!(job_id = %ctx.id(), error = %e, "download failed");
            }
        }

        ctx.set_result(outcome);
    }

    fn execute(&self, ctx: &JobContext, info: &MediaInfo) -> Result<DownloadedMedia> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        ctx.write_progress(ProgressSnapshot::stage(Stage::Downloading));

        let request = DownloadRequest {
            url: ctx.url(),
            work_dir: ctx.work_dir(),
            options: ctx.options(),
        };
        let reported =
            self.extractor
                .download(&request, &|sample| ctx.write_progress(sample), ctx.cancel_token())?;
        let downloaded = verify_output(&reported, ctx.work_dir())?;

        let plan = ConversionPlan::for_media(info, &self.convert_extractors);
        if !plan.needs_conversion() {
            let size = file_size(&downloaded, Error::Extraction)?;
            return Ok(DownloadedMedia {
                path: downloaded,
                size,
                converted: false,
            });
        }

        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        info!(
            job_id = %ctx.id(),
            converter = self.converter.name(),
            video = plan.video.ffmpeg_codec(),
            audio = plan.audio.ffmpeg_codec(),
            "converting to a compatible codec"
        );
        ctx.write_progress(postprocessing("started"));

        let output = ctx.work_dir().join(CONVERTED_FILE_NAME);
        let converted = self
            .converter
            .convert(&downloaded, &output, &plan, ctx.cancel_token())?;
        ctx.write_progress(postprocessing("finished"));

        if converted != downloaded
            && let Err(e) = std::fs::remove_file(&downloaded)
        {
            warn!(job_id = %ctx.id(), error = %e, "failed to remove pre-conversion file");
        }

        let size = file_size(&converted, Error::Conversion)?;
        Ok(DownloadedMedia {
            path: converted,
            size,
            converted: true,
        })
    }
}

fn postprocessing(status: &str) -> ProgressSnapshot {
    ProgressSnapshot {
        stage: Some(Stage::Postprocessing),
        postprocessor: Some("FFmpegVideoConvertor".to_string()),
        status: Some(status.to_string()),
        ..Default::default()
    }
}

/// Accept the reported file if it exists and is non-empty, otherwise fall
/// back to the largest finished file in the working directory.
fn verify_output(reported: &Path, work_dir: &Path) -> Result<PathBuf> {
    let non_empty = |p: &Path| std::fs::metadata(p).is_ok_and(|m| m.is_file() && m.len() > 0);

    if non_empty(reported) {
        return Ok(reported.to_path_buf());
    }
    match largest_file_in(work_dir) {
        Some(found) if non_empty(&found) => {
            debug!(
                reported = %reported.display(),
                found = %found.display(),
                "reported output missing, using largest file"
            );
            Ok(found)
        }
        _ => Err(Error::Extraction(
            "download finished but the output file is missing or empty".to_string(),
        )),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("worker panicked: {}", detail)
}
