//! Storage stub used when offload storage is not configured

use super::StorageUploader;
use async_trait::async_trait;
use std::path::Path;

/// Uploader that always fails
///
/// Jobs whose file fits inline never touch it; larger files end with a
/// storage failure instead of silently disappearing.
pub struct NoOpStorage;

#[async_trait]
impl StorageUploader for NoOpStorage {
    async fn upload(&self, _path: &Path, _object_name: &str) -> crate::Result<String> {
        Err(crate::Error::StorageUpload(
            "offload storage is not configured (set STORAGE_BUCKET)".into(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
