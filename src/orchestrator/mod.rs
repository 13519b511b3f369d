//! Download orchestrator: top-level lifecycle for a single request.
//!
//! `accepted -> running -> polling -> finalizing -> delivered | rejected | failed`
//!
//! The async side of a job lives here. It probes, applies the pre-flight
//! check, hands the job to a dedicated worker thread running the
//! [`ExtractionAdapter`], polls the shared [`JobContext`] for progress and
//! the result, and finally turns a finished file into a [`Delivery`]. The
//! job's working directory is disposed on every exit path.

mod delivery;
mod polling;

use crate::config::Config;
use crate::conversion::{FfmpegConverter, MediaConverter, NoOpConverter};
use crate::error::{Error, Result};
use crate::extractor::{ExtractionAdapter, MediaExtractor, NoOpExtractor, YtDlpExtractor};
use crate::job::JobContext;
use crate::policy::{DeliveryDecision, SizePolicy};
use crate::progress::{INLINE_NOTICE, OFFLOAD_NOTICE, ProgressTracker};
use crate::reporter::ProgressReporter;
use crate::storage::{HttpStorageUploader, NoOpStorage, StorageUploader};
use crate::types::{Delivery, JobOptions, MediaInfo, ProgressSnapshot, Stage};
use crate::utils::validate_url;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Runs fetch jobs end to end
///
/// One orchestrator serves any number of concurrent [`run`](Self::run)
/// calls; each call owns exactly one job and one worker thread.
///
/// # Examples
///
/// ```no_run
/// use videodl::{Config, DownloadOrchestrator, JobOptions, TracingReporter};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::from_env()?;
/// let options = JobOptions::from_config(&config);
/// let orchestrator = DownloadOrchestrator::new(config)?;
///
/// match orchestrator
///     .run("https://youtu.be/dQw4w9WgXcQ", options, &TracingReporter)
///     .await
/// {
///     Ok(delivery) => println!("{}", delivery.caption("https://youtu.be/dQw4w9WgXcQ")),
///     Err(e) => println!("{}", e.user_message()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DownloadOrchestrator {
    config: Arc<Config>,
    extractor: Arc<dyn MediaExtractor>,
    adapter: ExtractionAdapter,
    storage: Arc<dyn StorageUploader>,
    policy: SizePolicy,
}

impl DownloadOrchestrator {
    /// Create an orchestrator, discovering external tools from the config or PATH
    ///
    /// Missing tools degrade to no-op implementations that fail jobs with a
    /// typed error; construction itself only fails on invalid configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let extractor: Arc<dyn MediaExtractor> = if let Some(path) = &config.tools.ytdlp_path {
            Arc::new(YtDlpExtractor::new(path.clone()))
        } else if config.tools.search_path {
            YtDlpExtractor::from_path()
                .map(|e| Arc::new(e) as Arc<dyn MediaExtractor>)
                .unwrap_or_else(|| Arc::new(NoOpExtractor))
        } else {
            Arc::new(NoOpExtractor)
        };

        let converter: Arc<dyn MediaConverter> = if let Some(path) = &config.tools.ffmpeg_path {
            Arc::new(FfmpegConverter::new(path.clone()))
        } else if config.tools.search_path {
            FfmpegConverter::from_path()
                .map(|c| Arc::new(c) as Arc<dyn MediaConverter>)
                .unwrap_or_else(|| Arc::new(NoOpConverter))
        } else {
            Arc::new(NoOpConverter)
        };

        let storage: Arc<dyn StorageUploader> = match &config.storage {
            Some(storage) => Arc::new(HttpStorageUploader::new(storage.clone())?),
            None => Arc::new(NoOpStorage),
        };

        info!(
            extractor = extractor.name(),
            extractor_available = extractor.is_available(),
            converter = converter.name(),
            converter_available = converter.is_available(),
            storage = storage.name(),
            debug = config.debug,
            "download orchestrator initialized"
        );

        Ok(Self::with_components(
            Arc::new(config),
            extractor,
            converter,
            storage,
        ))
    }

    /// Create an orchestrator from explicit components
    pub fn with_components(
        config: Arc<Config>,
        extractor: Arc<dyn MediaExtractor>,
        converter: Arc<dyn MediaConverter>,
        storage: Arc<dyn StorageUploader>,
    ) -> Self {
        let adapter = ExtractionAdapter::new(
            Arc::clone(&extractor),
            converter,
            config.tools.convert_extractors.clone(),
        );
        Self {
            policy: SizePolicy::from_limits(&config.limits),
            config,
            extractor,
            adapter,
            storage,
        }
    }

    /// Shared configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one job to a terminal outcome
    ///
    /// Progress texts go to `reporter`; its failures are logged and never
    /// abort the job. The returned error is the job's typed failure, ready
    /// for [`Error::user_message`].
    pub async fn run(
        &self,
        url: &str,
        options: JobOptions,
        reporter: &dyn ProgressReporter,
    ) -> Result<Delivery> {
        validate_url(url)?;
        let url = url.trim();

        let ctx = Arc::new(JobContext::create(&self.config.job.temp_dir, url, options)?);
        let guard = DisposeGuard::new(Arc::clone(&ctx));
        info!(job_id = %ctx.id(), url, "job accepted");

        let outcome = self.execute(&ctx, reporter).await;

        // Disposal failures are logged by the guard and do not replace the outcome
        drop(guard);

        match &outcome {
            Ok(delivery) => info!(job_id = %ctx.id(), delivery = %delivery, "job delivered"),
            Err(e) if e.is_size_rejection() => {
                info!(job_id = %ctx.id(), error = %e, "job rejected by size policy")
            }
            Err(e) => error!(job_id = %ctx.id(), error_code = e.error_code(), error = %e, "job failed"),
        }
        outcome
    }

    async fn execute(&self, ctx: &Arc<JobContext>, reporter: &dyn ProgressReporter) -> Result<Delivery> {
        let mut tracker = ProgressTracker::new(self.config.job.report_interval);

        // Phase 1: probe and pre-flight check
        let budget = tracker.interval().min(ctx.options().timeout);
        polling::emit(
            &mut tracker,
            reporter,
            ctx,
            &ProgressSnapshot::stage(Stage::Probing),
            budget,
        )
        .await;
        let info = self.probe(ctx).await?;
        self.policy.preflight(info.declared_size)?;

        // Phase 2: hand the job to its worker
        self.spawn_worker(ctx, info.clone())?;

        // Phase 3: poll until a result or the timeout
        let media = polling::poll_until_terminal(
            ctx,
            &mut tracker,
            reporter,
            self.config.job.poll_interval,
        )
        .await?;

        // Phase 4: post-flight check and delivery
        let decision = self.policy.decide(media.size);
        let notice = match decision {
            DeliveryDecision::Inline { .. } => Some(INLINE_NOTICE),
            DeliveryDecision::Offload { .. } => Some(OFFLOAD_NOTICE),
            DeliveryDecision::Rejected { .. } => None,
        };
        if let Some(notice) = notice {
            polling::announce(&mut tracker, reporter, ctx, notice).await;
        }
        delivery::deliver(decision, self.storage.as_ref(), media, info).await
    }

    async fn probe(&self, ctx: &JobContext) -> Result<MediaInfo> {
        let extractor = Arc::clone(&self.extractor);
        let url = ctx.url().to_string();
        let options = ctx.options().clone();
        let timeout = options.timeout;
        let cancel = ctx.cancel_token().clone();

        // The probe tool is killed through the job token on timeout here and
        // on a dropped future by the dispose guard.
        let task = tokio::task::spawn_blocking(move || extractor.probe(&url, &options, &cancel));
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(Error::MetadataProbeFailed(format!("probe task failed: {}", e))),
            Err(_) => {
                warn!(job_id = %ctx.id(), timeout_secs = timeout.as_secs(), "probe timed out");
                ctx.cancel();
                Err(Error::Timeout { after: timeout })
            }
        }
    }

    fn spawn_worker(&self, ctx: &Arc<JobContext>, info: MediaInfo) -> Result<()> {
        let adapter = self.adapter.clone();
        let worker_ctx = Arc::clone(ctx);

        // Detached: the handle is dropped and the thread never blocks process exit
        std::thread::Builder::new()
            .name(format!("fetch-worker-{}", ctx.id()))
            .spawn(move || adapter.run(&worker_ctx, &info))
            .map(drop)
            .map_err(|e| Error::Extraction(format!("failed to start worker thread: {}", e)))
    }
}

/// Disposes the job on every exit path, including a dropped `run` future.
struct DisposeGuard {
    ctx: Arc<JobContext>,
}

impl DisposeGuard {
    fn new(ctx: Arc<JobContext>) -> Self {
        Self { ctx }
    }
}

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        self.ctx.cancel();
        if let Err(e) = self.ctx.dispose() {
            warn!(job_id = %self.ctx.id(), error = %e, "job cleanup failed");
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
