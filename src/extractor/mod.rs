//! Media extraction
//!
//! The core abstraction is the [`MediaExtractor`] trait, which wraps a
//! third-party extraction tool behind two operations: a metadata-only
//! `probe` and a `download` with a progress callback.
//!
//! - [`YtDlpExtractor`]: uses the external `yt-dlp` binary
//! - [`NoOpExtractor`]: fails every job when yt-dlp is unavailable
//!
//! [`ExtractionAdapter`] is the body of the per-job worker thread. It runs
//! the download, applies the codec table, calls the converter when needed,
//! and always ends by setting the job's result.

mod adapter;
mod cli;
mod noop;
pub mod parser;
mod traits;

pub use adapter::ExtractionAdapter;
pub use cli::YtDlpExtractor;
pub use noop::NoOpExtractor;
pub use traits::{DownloadRequest, MediaExtractor};
