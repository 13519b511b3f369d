//! Polling loop: progress forwarding and terminal-result detection.

use crate::error::{Error, Result};
use crate::job::JobContext;
use crate::progress::ProgressTracker;
use crate::reporter::ProgressReporter;
use crate::types::{DownloadedMedia, ProgressSnapshot, Stage};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Sample the job every `poll_interval` until the worker sets a result or
/// the job's timeout elapses.
///
/// The result check comes before the timeout check in every iteration, so
/// a result set at the same instant the timeout fires wins. On timeout the
/// job is cancelled and the worker is left to finish on its own.
pub(super) async fn poll_until_terminal(
    ctx: &JobContext,
    tracker: &mut ProgressTracker,
    reporter: &dyn ProgressReporter,
    poll_interval: Duration,
) -> Result<DownloadedMedia> {
    let timeout = ctx.options().timeout;
    let deadline = tokio::time::Instant::now() + timeout;

    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        if let Some(result) = ctx.read_result() {
            let media = result?;
            emit_done(ctx, tracker, reporter).await;
            return Ok(media);
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(abandon(ctx, timeout));
        }

        if let Some(snapshot) = ctx.read_progress() {
            // A slow reporter never pushes the timeout past the deadline
            let budget = tracker
                .interval()
                .min(deadline.saturating_duration_since(tokio::time::Instant::now()));
            emit(tracker, reporter, ctx, &snapshot, budget).await;

            if tokio::time::Instant::now() >= deadline && ctx.read_result().is_none() {
                return Err(abandon(ctx, timeout));
            }
        }
    }
}

fn abandon(ctx: &JobContext, timeout: Duration) -> Error {
    warn!(
        job_id = %ctx.id(),
        timeout_secs = timeout.as_secs(),
        "job timed out, abandoning worker"
    );
    ctx.cancel();
    Error::Timeout { after: timeout }
}

/// Offer a snapshot to the tracker and forward the text if it passes.
/// The report may take at most `budget`; overruns and failures are logged
/// and swallowed.
pub(super) async fn emit(
    tracker: &mut ProgressTracker,
    reporter: &dyn ProgressReporter,
    ctx: &JobContext,
    snapshot: &ProgressSnapshot,
    budget: Duration,
) {
    let Some(text) = tracker.offer(snapshot, Instant::now()) else {
        return;
    };
    debug!(job_id = %ctx.id(), stage = snapshot.current_stage().as_str(), "reporting progress");
    send(reporter, ctx, &text, budget).await;
}

/// Send a fixed notice once the report interval allows it
pub(super) async fn announce(
    tracker: &mut ProgressTracker,
    reporter: &dyn ProgressReporter,
    ctx: &JobContext,
    notice: &str,
) {
    wait_for_slot(tracker).await;
    if let Some(text) = tracker.offer_notice(notice, Instant::now()) {
        debug!(job_id = %ctx.id(), notice, "reporting notice");
        send(reporter, ctx, &text, tracker.interval()).await;
    }
}

async fn send(reporter: &dyn ProgressReporter, ctx: &JobContext, text: &str, budget: Duration) {
    match tokio::time::timeout(budget, reporter.report(text)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(job_id = %ctx.id(), error = %e, "progress report failed"),
        Err(_) => warn!(
            job_id = %ctx.id(),
            budget_ms = budget.as_millis() as u64,
            "progress report timed out"
        ),
    }
}

async fn wait_for_slot(tracker: &ProgressTracker) {
    loop {
        let wait = tracker.time_until_next(Instant::now());
        if wait.is_zero() {
            break;
        }
        tokio::time::sleep(wait).await;
    }
}

/// Make sure the completion message goes out once, respecting the interval.
async fn emit_done(ctx: &JobContext, tracker: &mut ProgressTracker, reporter: &dyn ProgressReporter) {
    if tracker.last_emitted_stage() == Some(Stage::Done) {
        return;
    }
    wait_for_slot(tracker).await;
    let budget = tracker.interval();
    emit(tracker, reporter, ctx, &ProgressSnapshot::stage(Stage::Done), budget).await;
}
