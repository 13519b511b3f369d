//! Offload storage
//!
//! Files above the inline limit are uploaded to object storage and delivered
//! as a link. [`StorageUploader`] is the seam:
//!
//! - [`HttpStorageUploader`]: Firebase-Storage style REST upload over reqwest
//! - [`NoOpStorage`]: fails uploads when no storage is configured

mod http;
mod noop;

pub use http::HttpStorageUploader;
pub use noop::NoOpStorage;

use async_trait::async_trait;
use std::path::Path;

/// Trait for uploading a finished file and obtaining a public reference
#[async_trait]
pub trait StorageUploader: Send + Sync {
    /// Upload `path` under `object_name` and return a download link
    ///
    /// # Errors
    ///
    /// `Error::StorageUpload` on any transport, auth or response failure
    async fn upload(&self, path: &Path, object_name: &str) -> crate::Result<String>;

    /// Whether uploads can succeed at all
    fn is_available(&self) -> bool {
        true
    }

    /// Name of this implementation
    fn name(&self) -> &'static str;
}
