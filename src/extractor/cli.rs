//! CLI-based extractor using the external yt-dlp binary

use super::parser::{
    DOWNLOAD_TAG, ErrorContext, PATH_TAG, POSTPROCESS_TAG, ToolLine, classify_error,
    parse_line, parse_probe_output,
};
use super::traits::{DownloadRequest, MediaExtractor};
use crate::error::Error;
use crate::process::{collect_bytes, collect_stream, join_collected, kill, wait_or_kill};
use crate::types::{JobOptions, MediaInfo, ProgressSnapshot};
use crate::utils::largest_file_in;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Age limit passed to the tool so age-gated videos are not skipped
const AGE_LIMIT: &str = "21";

/// Output file name template inside the working directory
const OUTPUT_TEMPLATE: &str = "video.%(ext)s";

/// Extractor that shells out to `yt-dlp`
///
/// The probe uses `--dump-single-json`. The download asks for one JSON
/// progress line per update (`--newline` with a progress template) and for
/// the final path after all post-processors have moved the file.
///
/// # Examples
///
/// ```no_run
/// use videodl::extractor::YtDlpExtractor;
/// use std::path::PathBuf;
///
/// // Explicit path
/// let extractor = YtDlpExtractor::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let extractor = YtDlpExtractor::from_path().expect("yt-dlp not found in PATH");
/// ```
pub struct YtDlpExtractor {
    binary_path: PathBuf,
}

impl YtDlpExtractor {
    /// Create an extractor with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Path of the wrapped binary
    pub fn binary_path(&self) -> &std::path::Path {
        &self.binary_path
    }

    /// Arguments for the metadata-only probe
    pub fn probe_args(url: &str, options: &JobOptions) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
        ];
        push_common_args(&mut args, options);
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Arguments for the full download
    pub fn download_args(request: &DownloadRequest<'_>) -> Vec<String> {
        let options = request.options;
        let mut args = vec![
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!("download:{DOWNLOAD_TAG}%(progress)j"),
            "--progress-template".to_string(),
            format!("postprocess:{POSTPROCESS_TAG}%(progress)j"),
            "--print".to_string(),
            format!("after_move:{PATH_TAG}%(filepath)s"),
            "--no-simulate".to_string(),
            "--no-mtime".to_string(),
            "-o".to_string(),
            request.work_dir.join(OUTPUT_TEMPLATE).display().to_string(),
            "--merge-output-format".to_string(),
            options.merge_output_format.clone(),
            "--retries".to_string(),
            options.retries.to_string(),
            "--socket-timeout".to_string(),
            options.socket_timeout.as_secs().max(1).to_string(),
        ];
        push_common_args(&mut args, options);
        if options.verbose {
            args.push("--verbose".to_string());
        }
        args.push("--".to_string());
        args.push(request.url.to_string());
        args
    }
}

fn push_common_args(args: &mut Vec<String>, options: &JobOptions) {
    args.extend([
        "--no-playlist".to_string(),
        "-f".to_string(),
        options.format.clone(),
        "--geo-bypass".to_string(),
        "--age-limit".to_string(),
        AGE_LIMIT.to_string(),
    ]);
    if options.force_ipv6 {
        args.push("--force-ipv6".to_string());
    }
    if let Some(cookies) = options.cookie_file.as_ref().filter(|p| p.is_file()) {
        args.push("--cookies".to_string());
        args.push(cookies.display().to_string());
    }
}

impl MediaExtractor for YtDlpExtractor {
    fn probe(
        &self,
        url: &str,
        options: &JobOptions,
        cancel: &CancellationToken,
    ) -> crate::Result<MediaInfo> {
        let mut child = Command::new(&self.binary_path)
            .args(Self::probe_args(url, options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::MetadataProbeFailed(format!("failed to execute yt-dlp: {}", e)))?;

        let stdout = collect_bytes(child.stdout.take());
        let stderr = collect_stream(child.stderr.take());

        let status = wait_or_kill(&mut child, cancel).map_err(|e| {
            Error::MetadataProbeFailed(format!("failed to wait for yt-dlp: {}", e))
        })?;
        // Collector threads are left to finish on their own once killed; a
        // grandchild may still hold the pipes open.
        let Some(status) = status else {
            info!(url, "job abandoned, stopped yt-dlp probe");
            return Err(Error::Cancelled);
        };

        let diagnostics = join_collected(stderr);
        if !status.success() {
            debug!(url, %status, stderr = %diagnostics.trim(), "probe failed");
            return Err(classify_error(&diagnostics, ErrorContext::Probe));
        }

        let stdout = stdout.join().unwrap_or_default();
        let info = parse_probe_output(&stdout)?;
        debug!(
            url,
            extractor = info.extractor.as_deref().unwrap_or("unknown"),
            declared_size = ?info.declared_size,
            vcodec = info.vcodec.as_deref().unwrap_or("unknown"),
            acodec = info.acodec.as_deref().unwrap_or("unknown"),
            "probe finished"
        );
        Ok(info)
    }

    fn download(
        &self,
        request: &DownloadRequest<'_>,
        progress: &dyn Fn(ProgressSnapshot),
        cancel: &CancellationToken,
    ) -> crate::Result<PathBuf> {
        let args = Self::download_args(request);
        debug!(binary = %self.binary_path.display(), ?args, "running yt-dlp");

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Extraction(format!("failed to execute yt-dlp: {}", e)))?;

        let stderr = collect_stream(child.stderr.take());
        let mut final_path = None;

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                if cancel.is_cancelled() {
                    info!(url = request.url, "job abandoned, stopping yt-dlp");
                    kill(&mut child);
                    join_collected(stderr);
                    return Err(Error::Cancelled);
                }
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        debug!(error = %e, "stopped reading yt-dlp output");
                        break;
                    }
                };
                match parse_line(&line) {
                    ToolLine::Progress(snapshot) => progress(snapshot),
                    ToolLine::FinalPath(path) => final_path = Some(path),
                    ToolLine::Other => trace!(line = %line, "yt-dlp"),
                }
            }
        }

        let status = wait_or_kill(&mut child, cancel)
            .map_err(|e| Error::Extraction(format!("failed to wait for yt-dlp: {}", e)))?;
        let diagnostics = join_collected(stderr);

        let Some(status) = status else {
            return Err(Error::Cancelled);
        };
        if !status.success() {
            debug!(url = request.url, %status, stderr = %diagnostics.trim(), "download failed");
            return Err(classify_error(&diagnostics, ErrorContext::Download));
        }

        final_path
            .filter(|p| p.is_file())
            .or_else(|| largest_file_in(request.work_dir))
            .ok_or_else(|| {
                Error::Extraction("yt-dlp finished but produced no output file".to_string())
            })
    }

    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use std::path::Path;

    fn options() -> JobOptions {
        JobOptions::from_config(&Config::default())
    }

    #[test]
    fn probe_args_end_with_url_after_separator() {
        let args = YtDlpExtractor::probe_args("https://youtu.be/x", &options());
        assert!(args.contains(&"--dump-single-json".to_string()));
        assert!(args.contains(&"--skip-download".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(&args[args.len() - 2..], ["--", "https://youtu.be/x"]);
    }

    #[test]
    fn download_args_write_into_work_dir() {
        let options = options();
        let request = DownloadRequest {
            url: "https://youtu.be/x",
            work_dir: Path::new("/tmp/job-1"),
            options: &options,
        };
        let args = YtDlpExtractor::download_args(&request);

        let after = |flag: &str| {
            let pos = args.iter().position(|a| a == flag).unwrap();
            args[pos + 1].clone()
        };
        assert_eq!(after("-o"), "/tmp/job-1/video.%(ext)s");
        assert_eq!(after("-f"), options.format);
        assert_eq!(after("--merge-output-format"), "mp4");
        assert_eq!(after("--retries"), "10");
        assert_eq!(after("--socket-timeout"), "30");
        assert_eq!(after("--print"), "after_move:[path] %(filepath)s");
        assert!(args.contains(&"download:[dl] %(progress)j".to_string()));
        assert!(args.contains(&"--force-ipv6".to_string()));
        assert!(!args.contains(&"--verbose".to_string()));
    }

    #[test]
    fn cookies_are_passed_only_when_the_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let cookies = dir.path().join("cookies.txt");

        let mut options = options();
        options.cookie_file = Some(cookies.clone());
        assert!(!YtDlpExtractor::probe_args("https://a.b", &options).contains(&"--cookies".to_string()));

        std::fs::write(&cookies, "# Netscape HTTP Cookie File\n").unwrap();
        let args = YtDlpExtractor::probe_args("https://a.b", &options);
        let pos = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[pos + 1], cookies.display().to_string());
    }

    #[test]
    fn verbose_and_ipv6_follow_options() {
        let mut options = options();
        options.verbose = true;
        options.force_ipv6 = false;
        let request = DownloadRequest {
            url: "https://a.b",
            work_dir: Path::new("/tmp"),
            options: &options,
        };
        let args = YtDlpExtractor::download_args(&request);
        assert!(args.contains(&"--verbose".to_string()));
        assert!(!args.contains(&"--force-ipv6".to_string()));
    }

    #[test]
    fn missing_binary_maps_to_typed_errors() {
        let extractor = YtDlpExtractor::new(PathBuf::from("/nonexistent/yt-dlp-xyz"));
        let options = options();
        assert!(matches!(
            extractor.probe("https://a.b", &options, &CancellationToken::new()),
            Err(Error::MetadataProbeFailed(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let request = DownloadRequest {
            url: "https://a.b",
            work_dir: dir.path(),
            options: &options,
        };
        assert!(matches!(
            extractor.download(&request, &|_| {}, &CancellationToken::new()),
            Err(Error::Extraction(_))
        ));
    }

    #[test]
    fn from_path_returns_none_for_nonexistent_binary() {
        assert!(which::which("nonexistent-yt-dlp-binary-xyz").is_err());
    }

    #[test]
    #[ignore = "requires yt-dlp and network access"]
    fn probe_real_video() {
        let extractor = YtDlpExtractor::from_path().expect("yt-dlp in PATH");
        let info = extractor
            .probe(
                "https://www.youtube.com/watch?v=jNQXAC9IVRw",
                &options(),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(info.extractor.as_deref(), Some("youtube"));
        assert!(info.title.is_some());
    }
}
