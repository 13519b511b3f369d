//! Tests for orchestrator construction and early exits.

use std::path::Path;
use std::time::Duration;

use tempfile::tempdir;

use crate::config::Config;
use crate::error::Error;
use crate::reporter::TracingReporter;
use crate::types::JobOptions;

use super::DownloadOrchestrator;

fn config_in(temp: &Path) -> Config {
    let mut config = Config::default();
    config.job.temp_dir = temp.join("jobs");
    config.job.poll_interval = Duration::from_millis(10);
    config.job.report_interval = Duration::from_millis(10);
    config.tools.search_path = false;
    config
}

fn job_dirs(temp: &Path) -> usize {
    std::fs::read_dir(temp.join("jobs"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[tokio::test]
async fn missing_tools_fail_jobs_with_typed_error() {
    let temp = tempdir().unwrap();
    let config = config_in(temp.path());
    let options = JobOptions::from_config(&config);
    let orchestrator = DownloadOrchestrator::new(config).unwrap();

    let err = orchestrator
        .run("https://youtu.be/x", options, &TracingReporter)
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "metadata_probe_failed");
    assert_eq!(job_dirs(temp.path()), 0);
}

#[tokio::test]
async fn explicit_tool_path_is_used() {
    let temp = tempdir().unwrap();
    let mut config = config_in(temp.path());
    config.tools.ytdlp_path = Some(temp.path().join("no-such-yt-dlp"));
    let options = JobOptions::from_config(&config);
    let orchestrator = DownloadOrchestrator::new(config).unwrap();

    match orchestrator
        .run("https://youtu.be/x", options, &TracingReporter)
        .await
    {
        Err(Error::MetadataProbeFailed(message)) => {
            assert!(message.contains("failed to execute yt-dlp"), "{message}")
        }
        other => panic!("expected probe failure, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_url_is_rejected_before_any_work() {
    let temp = tempdir().unwrap();
    let config = config_in(temp.path());
    let options = JobOptions::from_config(&config);
    let orchestrator = DownloadOrchestrator::new(config).unwrap();

    let err = orchestrator
        .run("ftp://example.com/video", options, &TracingReporter)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidUrl { .. }));
    assert!(!temp.path().join("jobs").exists());
}

#[test]
fn new_rejects_invalid_config() {
    let temp = tempdir().unwrap();
    let mut config = config_in(temp.path());
    config.limits.inline_limit_bytes = config.limits.max_file_size_bytes + 1;
    assert!(matches!(
        DownloadOrchestrator::new(config),
        Err(Error::Config { .. })
    ));
}

#[test]
fn config_is_shared_not_copied_per_job() {
    let temp = tempdir().unwrap();
    let orchestrator = DownloadOrchestrator::new(config_in(temp.path())).unwrap();
    let clone = orchestrator.clone();
    assert!(std::ptr::eq(orchestrator.config(), clone.config()));
}

#[cfg(unix)]
#[tokio::test]
async fn probe_timeout_kills_the_extraction_tool() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempdir().unwrap();
    let marker = temp.path().join("probe-finished");
    let script = temp.path().join("yt-dlp");
    std::fs::write(
        &script,
        format!("#!/bin/sh\nsleep 2\ntouch '{}'\n", marker.display()),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut config = config_in(temp.path());
    config.tools.ytdlp_path = Some(script);
    let options = JobOptions::from_config(&config).with_timeout(Duration::from_millis(300));
    let orchestrator = DownloadOrchestrator::new(config).unwrap();

    let err = orchestrator
        .run("https://youtu.be/x", options, &TracingReporter)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::Timeout {
            after: Duration::from_millis(300)
        }
    );

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!marker.exists(), "probe tool kept running after the job failed");
    assert_eq!(job_dirs(temp.path()), 0);
}
