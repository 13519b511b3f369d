//! Test configuration helpers

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use videodl::utils::BYTES_MB;
use videodl::{
    Config, DownloadOrchestrator, JobOptions, MediaConverter, MediaExtractor, StorageUploader,
};

/// One GiB, the ceiling used by the size scenarios
pub const GIB: u64 = 1024 * BYTES_MB;

/// Configuration with fast polling, a 50 MiB inline limit and a 1 GiB ceiling,
/// rooted in `temp`
pub fn test_config(temp: &Path) -> Config {
    let mut config = Config::default();
    config.limits.inline_limit_bytes = 50 * BYTES_MB;
    config.limits.max_file_size_bytes = GIB;
    config.job.temp_dir = temp.join("jobs");
    config.job.poll_interval = Duration::from_millis(10);
    config.job.report_interval = Duration::from_millis(20);
    config.job.timeout = Duration::from_secs(10);
    config.tools.search_path = false;
    config
}

/// Job options for `config` with a custom timeout
pub fn options_with_timeout(config: &Config, timeout: Duration) -> JobOptions {
    JobOptions::from_config(config).with_timeout(timeout)
}

/// Build an orchestrator from fakes in a fresh temp directory
pub fn orchestrator_with(
    extractor: Arc<dyn MediaExtractor>,
    converter: Arc<dyn MediaConverter>,
    storage: Arc<dyn StorageUploader>,
) -> (DownloadOrchestrator, TempDir) {
    let temp = tempfile::tempdir().expect("temp dir");
    let config = Arc::new(test_config(temp.path()));
    let orchestrator = DownloadOrchestrator::with_components(config, extractor, converter, storage);
    (orchestrator, temp)
}

/// Directory holding all job working directories for `temp`
pub fn jobs_root(temp: &Path) -> PathBuf {
    temp.join("jobs")
}

/// Every file or directory left below the jobs root
pub fn leftover_entries(temp: &Path) -> Vec<PathBuf> {
    let root = jobs_root(temp);
    if !root.exists() {
        return Vec::new();
    }
    walkdir::WalkDir::new(&root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .collect()
}
