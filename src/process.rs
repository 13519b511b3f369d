//! Helpers for supervising external tool processes from a worker thread.

use std::io::Read;
use std::process::{Child, ExitStatus};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often a waiting worker re-checks its cancellation token
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Keep at most this many trailing bytes of tool diagnostics
const MAX_CAPTURED_BYTES: usize = 64 * 1024;

/// Drain a child pipe on its own thread so the child never blocks on a full
/// pipe. Returns the captured text (tail only, lossy UTF-8).
pub(crate) fn collect_stream<R>(stream: Option<R>) -> JoinHandle<String>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let Some(mut stream) = stream else {
            return String::new();
        };
        let mut captured = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    captured.extend_from_slice(&buf[..n]);
                    if captured.len() > MAX_CAPTURED_BYTES {
                        let excess = captured.len() - MAX_CAPTURED_BYTES;
                        captured.drain(..excess);
                    }
                }
            }
        }
        String::from_utf8_lossy(&captured).into_owned()
    })
}

/// Read a child pipe to the end on its own thread, keeping everything.
/// Used for structured output that must arrive whole.
pub(crate) fn collect_bytes<R>(stream: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut captured = Vec::new();
        if let Some(mut stream) = stream
            && let Err(e) = stream.read_to_end(&mut captured)
        {
            tracing::debug!(error = %e, "stopped reading child output");
        }
        captured
    })
}

/// Wait for `child` to exit. If `cancel` fires first, kill the child and
/// return `Ok(None)`.
pub(crate) fn wait_or_kill(
    child: &mut Child,
    cancel: &CancellationToken,
) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if cancel.is_cancelled() {
            kill(child);
            return Ok(None);
        }
        std::thread::sleep(WAIT_POLL_INTERVAL);
    }
}

/// Kill and reap a child, ignoring "already exited" errors
pub(crate) fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "child process already exited");
    }
    let _ = child.wait();
}

/// Join a collector thread, tolerating a panicked collector
pub(crate) fn join_collected(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}
