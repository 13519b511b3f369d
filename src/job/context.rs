//! Job context: per-request state shared between the orchestrator and its worker.

use crate::error::{Error, Result};
use crate::types::{DownloadedMedia, JobId, JobOptions, ProgressSnapshot};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Terminal value of a job as produced by the worker
pub type JobResult = Result<DownloadedMedia>;

/// Per-request state.
///
/// The progress slot is written only by the worker and read only by the
/// orchestrator; the result slot is written exactly once by the worker.
/// Both sit behind synchronized storage because the two sides run on
/// different threads.
#[derive(Debug)]
pub struct JobContext {
    id: JobId,
    url: String,
    options: JobOptions,
    work_dir: PathBuf,
    cancel_token: CancellationToken,
    progress: Mutex<Option<ProgressSnapshot>>,
    result: OnceLock<JobResult>,
    disposed: AtomicBool,
    dispose_count: AtomicUsize,
}

impl JobContext {
    /// Create a context with a fresh, empty working directory under `parent`.
    pub fn create(parent: &Path, url: impl Into<String>, options: JobOptions) -> Result<Self> {
        let id = JobId::new();
        let work_dir = parent.join(format!("job-{id}"));

        std::fs::create_dir_all(parent).map_err(|e| {
            Error::Extraction(format!(
                "failed to create temp directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
        // create_dir (not _all) so an existing directory is never reused
        std::fs::create_dir(&work_dir).map_err(|e| {
            Error::Extraction(format!(
                "failed to create working directory '{}': {}",
                work_dir.display(),
                e
            ))
        })?;

        debug!(job_id = %id, work_dir = %work_dir.display(), "job working directory created");

        Ok(Self {
            id,
            url: url.into(),
            options,
            work_dir,
            cancel_token: CancellationToken::new(),
            progress: Mutex::new(None),
            result: OnceLock::new(),
            disposed: AtomicBool::new(false),
            dispose_count: AtomicUsize::new(0),
        })
    }

    /// Job identifier
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Target URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Resolved options
    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// The job's working directory
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Token cancelled when the orchestrator abandons the job
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Whether the orchestrator has abandoned the job
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Signal the worker that nobody is waiting for it anymore
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Store the latest progress sample (worker side, last write wins).
    ///
    /// A sample from an earlier stage than the stored one is dropped, keeping
    /// the observed stage sequence monotonic.
    pub fn write_progress(&self, snapshot: ProgressSnapshot) {
        let mut slot = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = slot.as_ref()
            && snapshot.current_stage() < current.current_stage()
        {
            return;
        }
        *slot = Some(snapshot);
    }

    /// Copy of the latest progress sample (orchestrator side)
    pub fn read_progress(&self) -> Option<ProgressSnapshot> {
        self.progress
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Store the terminal result. Returns `false` if one was already set; the
    /// first value is kept.
    pub fn set_result(&self, value: JobResult) -> bool {
        let accepted = self.result.set(value).is_ok();
        if !accepted {
            warn!(job_id = %self.id, "job result already set, ignoring second value");
        }
        accepted
    }

    /// Non-blocking check for the terminal result
    pub fn read_result(&self) -> Option<JobResult> {
        self.result.get().cloned()
    }

    /// Whether [`dispose`](Self::dispose) has run
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Number of times disposal actually removed state (0 or 1)
    pub fn dispose_count(&self) -> usize {
        self.dispose_count.load(Ordering::Acquire)
    }

    /// Remove the working directory. Idempotent: only the first call has an
    /// effect, later calls return `Ok(())`.
    pub fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.dispose_count.fetch_add(1, Ordering::AcqRel);

        match std::fs::remove_dir_all(&self.work_dir) {
            Ok(()) => {
                debug!(job_id = %self.id, "job working directory removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(
                    job_id = %self.id,
                    work_dir = %self.work_dir.display(),
                    error = %e,
                    "failed to remove job working directory"
                );
                Err(Error::Cleanup {
                    path: self.work_dir.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl Drop for JobContext {
    fn drop(&mut self) {
        // An abandoned worker may have written into the directory after the
        // orchestrator disposed it; the last reference sweeps it again.
        if !self.is_disposed() {
            let _ = self.dispose();
        } else if self.work_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.work_dir) {
                warn!(job_id = %self.id, error = %e, "failed to sweep abandoned job directory");
            }
        }
    }
}
