//! Progress reporting to the chat surface
//!
//! The orchestrator hands every progress text that passes the throttle to a
//! [`ProgressReporter`]. Delivery failures are the reporter's problem only:
//! the orchestrator logs them and keeps going.

use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Destination for progress texts (typically "edit the status message")
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    /// Deliver one progress text
    async fn report(&self, text: &str) -> Result<()>;
}

/// Forwards progress texts into a tokio channel
///
/// The embedding chat transport owns the receiver and turns each text into
/// a message edit.
#[derive(Clone, Debug)]
pub struct ChannelReporter {
    sender: mpsc::Sender<String>,
}

impl ChannelReporter {
    /// Create a reporter and the receiver its texts arrive on
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Wrap an existing sender
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ProgressReporter for ChannelReporter {
    async fn report(&self, text: &str) -> Result<()> {
        // a full channel means the chat side is behind; a stale update is
        // worth less than not blocking the poll loop
        self.sender.try_send(text.to_string()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                Error::Network("progress channel is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                Error::Network("progress channel is closed".to_string())
            }
        })
    }
}

/// Writes progress texts to the tracing log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

#[async_trait]
impl ProgressReporter for TracingReporter {
    async fn report(&self, text: &str) -> Result<()> {
        tracing::info!(progress = %text, "job progress");
        Ok(())
    }
}
