//! Progress formatting and throttling
//!
//! [`format_progress`] turns a raw [`ProgressSnapshot`] into chat text and
//! decides whether enough time has passed since the previous message.
//! [`ProgressTracker`] keeps the emission time and last text between polls.

use crate::types::{ProgressSnapshot, Stage};
use crate::utils::{BYTES_MB, format_mib};
use std::path::Path;
use std::time::{Duration, Instant};

/// Default minimum spacing between two progress messages
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(1500);

/// Sent before a file too large for the chat is uploaded to storage
pub const OFFLOAD_NOTICE: &str = "File too large for chat. Uploading to cloud storage...";

/// Sent before a file is handed to the chat directly
pub const INLINE_NOTICE: &str = "Upload in progress...";

/// Format `snapshot` and decide whether it may be emitted at `now`.
///
/// `should_emit` is true only when no message was emitted yet or at least
/// `interval` has passed since `previous_emit`.
pub fn format_progress(
    snapshot: &ProgressSnapshot,
    previous_emit: Option<Instant>,
    now: Instant,
    interval: Duration,
) -> (String, bool) {
    let text = render(snapshot);
    let should_emit = match previous_emit {
        None => true,
        Some(previous) => now.saturating_duration_since(previous) >= interval,
    };
    (text, should_emit)
}

fn render(snapshot: &ProgressSnapshot) -> String {
    match snapshot.current_stage() {
        Stage::Probing => "Fetching video information...".to_string(),
        Stage::Downloading => render_download(snapshot),
        Stage::Postprocessing => format!(
            "Postprocessing with {}...\nStatus: {}",
            snapshot.postprocessor.as_deref().unwrap_or("unknown postprocessor"),
            snapshot.status.as_deref().unwrap_or("processing")
        ),
        Stage::Done => "Download complete. Preparing the video...".to_string(),
        Stage::Failed => "Download failed.".to_string(),
    }
}

fn render_download(snapshot: &ProgressSnapshot) -> String {
    let filename = snapshot
        .filename
        .as_deref()
        .and_then(|f| Path::new(f).file_name())
        .and_then(|f| f.to_str())
        .unwrap_or("video");

    let percent = snapshot
        .percent()
        .map(|p| format!("{p:.2}%"))
        .unwrap_or_else(|| "unknown".to_string());

    let speed = match snapshot.speed_bps {
        Some(bps) if bps > 0.0 => format!("{:.2} MiB/s", bps / BYTES_MB as f64),
        _ => "N/A".to_string(),
    };

    let total = snapshot
        .total_bytes
        .map(format_mib)
        .unwrap_or_else(|| "unknown".to_string());

    let eta = snapshot
        .eta
        .map(|eta| format!("{} seconds", eta.as_secs()))
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "Downloading {filename}...\t[{percent}]\nDownloaded: {} at {speed}\nTotal: {total}\nETA: {eta}",
        format_mib(snapshot.downloaded_bytes)
    )
}

/// Stateful wrapper around [`format_progress`] used by the polling loop.
///
/// Suppresses texts identical to the last emitted one; the chat surface
/// rejects edits that change nothing.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    interval: Duration,
    last_emit: Option<Instant>,
    last_text: Option<String>,
    last_stage: Option<Stage>,
}

impl ProgressTracker {
    /// Create a tracker with the given minimum spacing
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            last_text: None,
            last_stage: None,
        }
    }

    /// Offer a snapshot at `now`. Returns the text to send if it should be
    /// emitted, and records the emission.
    pub fn offer(&mut self, snapshot: &ProgressSnapshot, now: Instant) -> Option<String> {
        let (text, should_emit) = format_progress(snapshot, self.last_emit, now, self.interval);
        if !should_emit {
            return None;
        }
        self.accept(text, snapshot.current_stage(), now)
    }

    /// Offer a fixed notice under the same spacing and dedupe rules. The
    /// notice does not change the recorded stage.
    pub fn offer_notice(&mut self, text: &str, now: Instant) -> Option<String> {
        if !self.time_until_next(now).is_zero() {
            return None;
        }
        let stage = self.last_stage.unwrap_or(Stage::Probing);
        self.accept(text.to_string(), stage, now)
    }

    fn accept(&mut self, text: String, stage: Stage, now: Instant) -> Option<String> {
        if self.last_text.as_deref() == Some(text.as_str()) {
            return None;
        }
        self.last_emit = Some(now);
        self.last_stage = Some(stage);
        self.last_text = Some(text.clone());
        Some(text)
    }

    /// Minimum spacing between two emitted messages
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left before another message may be emitted
    pub fn time_until_next(&self, now: Instant) -> Duration {
        match self.last_emit {
            None => Duration::ZERO,
            Some(previous) => self
                .interval
                .saturating_sub(now.saturating_duration_since(previous)),
        }
    }

    /// Stage of the most recently emitted message
    pub fn last_emitted_stage(&self) -> Option<Stage> {
        self.last_stage
    }

    /// When the most recent message was emitted
    pub fn last_emit(&self) -> Option<Instant> {
        self.last_emit
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_INTERVAL)
    }
}
