//! # videodl
//!
//! Download orchestration core for a chat bot that fetches videos from
//! social media and video hosting sites.
//!
//! ## Design Philosophy
//!
//! videodl is designed to be:
//! - **Library-first** - No chat transport, purely a Rust crate for embedding
//! - **One job per request** - An async control flow polls a dedicated worker thread
//! - **Always clean** - Every job's working directory is removed on every exit path
//! - **Typed failures** - Every outcome maps to one short user-facing message
//!
//! ## Quick Start
//!
//! ```no_run
//! use videodl::{ChannelReporter, Config, Delivery, DownloadOrchestrator, JobOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let options = JobOptions::from_config(&config);
//!     let orchestrator = DownloadOrchestrator::new(config)?;
//!
//!     // Progress texts arrive here; the chat transport edits its status message
//!     let (reporter, mut progress) = ChannelReporter::channel(16);
//!     tokio::spawn(async move {
//!         while let Some(text) = progress.recv().await {
//!             println!("{text}");
//!         }
//!     });
//!
//!     let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
//!     match orchestrator.run(url, options, &reporter).await {
//!         Ok(delivery @ Delivery::Inline { .. }) => println!("send file: {}", delivery.caption(url)),
//!         Ok(delivery @ Delivery::Offload { .. }) => println!("send link: {}", delivery.caption(url)),
//!         Err(e) => println!("{}", e.user_message()),
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Codec table and media conversion
pub mod conversion;
/// Error types
pub mod error;
/// Media extraction and the per-job worker body
pub mod extractor;
/// Per-job shared state
pub mod job;
/// Download orchestrator
pub mod orchestrator;
/// Size and destination policy
pub mod policy;
/// External process supervision
pub(crate) mod process;
/// Progress formatting and throttling
pub mod progress;
/// Progress reporting to the chat surface
pub mod reporter;
/// Offload storage
pub mod storage;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, JobConfig, LimitsConfig, StorageConfig, ToolsConfig};
pub use conversion::{ConversionPlan, FfmpegConverter, MediaConverter, NoOpConverter};
pub use error::{Error, Result};
pub use extractor::{
    DownloadRequest, ExtractionAdapter, MediaExtractor, NoOpExtractor, YtDlpExtractor,
};
pub use job::{JobContext, JobResult};
pub use orchestrator::DownloadOrchestrator;
pub use policy::{DeliveryDecision, SizePolicy};
pub use progress::{ProgressTracker, format_progress};
pub use reporter::{ChannelReporter, ProgressReporter, TracingReporter};
pub use storage::{HttpStorageUploader, NoOpStorage, StorageUploader};
pub use types::{
    Delivery, DownloadedMedia, JobId, JobOptions, MediaInfo, ProgressSnapshot, Stage,
};
