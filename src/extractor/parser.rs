//! Parser for yt-dlp output
//!
//! The CLI extractor asks yt-dlp for machine-readable output: a single JSON
//! document for the probe, and tagged lines (`[dl] {json}`, `[pp] {json}`,
//! `[path] /file`) while downloading. Everything else on stdout is noise.

use crate::error::Error;
use crate::types::{MediaInfo, ProgressSnapshot, Stage};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Tag prefix of download progress lines
pub const DOWNLOAD_TAG: &str = "[dl] ";
/// Tag prefix of post-processing progress lines
pub const POSTPROCESS_TAG: &str = "[pp] ";
/// Tag prefix of the final file path line
pub const PATH_TAG: &str = "[path] ";

/// One classified line of yt-dlp stdout
#[derive(Debug, Clone, PartialEq)]
pub enum ToolLine {
    /// Progress sample
    Progress(ProgressSnapshot),
    /// Path of the finished file after all post-processing
    FinalPath(PathBuf),
    /// Anything else
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct DownloadProgress {
    status: Option<String>,
    downloaded_bytes: Option<f64>,
    total_bytes: Option<f64>,
    total_bytes_estimate: Option<f64>,
    speed: Option<f64>,
    eta: Option<f64>,
    filename: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PostprocessProgress {
    status: Option<String>,
    postprocessor: Option<String>,
}

/// Classify one stdout line
pub fn parse_line(line: &str) -> ToolLine {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(json) = line.strip_prefix(DOWNLOAD_TAG) {
        return serde_json::from_str::<DownloadProgress>(json)
            .map(|p| ToolLine::Progress(download_snapshot(p)))
            .unwrap_or(ToolLine::Other);
    }
    if let Some(json) = line.strip_prefix(POSTPROCESS_TAG) {
        return serde_json::from_str::<PostprocessProgress>(json)
            .map(|p| ToolLine::Progress(postprocess_snapshot(p)))
            .unwrap_or(ToolLine::Other);
    }
    if let Some(path) = line.strip_prefix(PATH_TAG) {
        let path = path.trim();
        if !path.is_empty() && path != "NA" {
            return ToolLine::FinalPath(PathBuf::from(path));
        }
    }
    ToolLine::Other
}

fn download_snapshot(p: DownloadProgress) -> ProgressSnapshot {
    let total = p.total_bytes.or(p.total_bytes_estimate).map(to_bytes);
    let mut downloaded = p.downloaded_bytes.map(to_bytes).unwrap_or(0);
    if p.status.as_deref() == Some("finished")
        && let Some(total) = total
    {
        downloaded = downloaded.max(total);
    }

    ProgressSnapshot {
        stage: Some(Stage::Downloading),
        downloaded_bytes: downloaded,
        total_bytes: total,
        speed_bps: p.speed.filter(|s| s.is_finite() && *s >= 0.0),
        eta: p
            .eta
            .filter(|e| e.is_finite() && *e >= 0.0)
            .map(Duration::from_secs_f64),
        filename: p.filename,
        postprocessor: None,
        status: p.status,
    }
}

fn postprocess_snapshot(p: PostprocessProgress) -> ProgressSnapshot {
    ProgressSnapshot {
        stage: Some(Stage::Postprocessing),
        postprocessor: p.postprocessor,
        status: p.status,
        ..Default::default()
    }
}

fn to_bytes(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    vcodec: Option<String>,
    acodec: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeDocument {
    #[serde(rename = "_type")]
    kind: Option<String>,
    id: Option<String>,
    title: Option<String>,
    extractor: Option<String>,
    extractor_key: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    vcodec: Option<String>,
    acodec: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<f64>,
    ext: Option<String>,
    #[serde(default)]
    requested_formats: Vec<ProbeFormat>,
}

/// Parse the JSON document printed by `yt-dlp --dump-single-json`
///
/// The declared size is taken from `filesize`, then `filesize_approx`, then
/// the sum over `requested_formats` when every part reports one. Codecs of
/// merged formats are taken from the matching requested format.
pub fn parse_probe_output(stdout: &[u8]) -> crate::Result<MediaInfo> {
    let doc: ProbeDocument = serde_json::from_slice(stdout)
        .map_err(|e| Error::MetadataProbeFailed(format!("unreadable probe output: {}", e)))?;

    if doc.kind.as_deref() == Some("playlist") {
        return Err(Error::UnsupportedSource(
            "playlists are not supported, send a link to a single video".into(),
        ));
    }

    let declared_size = doc
        .filesize
        .or(doc.filesize_approx)
        .map(to_bytes)
        .or_else(|| sum_requested_sizes(&doc.requested_formats));

    let vcodec = pick_codec(doc.vcodec, doc.requested_formats.iter().map(|f| f.vcodec.as_deref()));
    let acodec = pick_codec(doc.acodec, doc.requested_formats.iter().map(|f| f.acodec.as_deref()));

    Ok(MediaInfo {
        id: doc.id,
        title: doc.title,
        extractor: doc.extractor.or(doc.extractor_key).map(|e| e.to_lowercase()),
        declared_size,
        vcodec,
        acodec,
        width: doc.width,
        height: doc.height,
        duration_secs: doc.duration,
        ext: doc.ext,
    })
}

fn sum_requested_sizes(formats: &[ProbeFormat]) -> Option<u64> {
    if formats.is_empty() {
        return None;
    }
    formats
        .iter()
        .map(|f| f.filesize.or(f.filesize_approx).map(to_bytes))
        .sum()
}

fn pick_codec<'a>(
    top_level: Option<String>,
    requested: impl Iterator<Item = Option<&'a str>>,
) -> Option<String> {
    let is_real = |c: &str| !c.is_empty() && !c.eq_ignore_ascii_case("none");
    match top_level {
        Some(codec) if is_real(&codec) => Some(codec),
        _ => requested.flatten().find(|c| is_real(c)).map(str::to_string),
    }
}

/// Map yt-dlp diagnostics to a failure variant
///
/// `context` distinguishes probe from download failures: an unclassified
/// probe error is [`Error::MetadataProbeFailed`], an unclassified download
/// error is [`Error::Extraction`].
pub fn classify_error(stderr: &str, context: ErrorContext) -> Error {
    let message = summarize(stderr);
    let lower = stderr.to_lowercase();

    if lower.contains("unsupported url") || lower.contains("no video formats found") {
        return Error::UnsupportedSource(message);
    }
    if NETWORK_MARKERS.iter().any(|m| lower.contains(m)) {
        return Error::Network(message);
    }
    match context {
        ErrorContext::Probe => Error::MetadataProbeFailed(message),
        ErrorContext::Download => Error::Extraction(message),
    }
}

/// Which phase produced the diagnostics passed to [`classify_error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    /// Metadata-only probe
    Probe,
    /// Full download
    Download,
}

const NETWORK_MARKERS: &[&str] = &[
    "http error 5",
    "http error 429",
    "timed out",
    "connection reset",
    "connection refused",
    "connection aborted",
    "network is unreachable",
    "name or service not known",
    "temporary failure in name resolution",
    "failed to resolve",
    "unable to download webpage",
    "unable to download video data",
    "ssl:",
];

/// Last `ERROR:` line of the tool output, or the last non-empty line
fn summarize(stderr: &str) -> String {
    let lines = || stderr.lines().map(str::trim).filter(|l| !l.is_empty());
    lines()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
        .or_else(|| lines().next_back().map(str::to_string))
        .unwrap_or_else(|| "no diagnostics from extraction tool".to_string())
}
