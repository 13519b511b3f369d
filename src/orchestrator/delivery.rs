//! Post-flight check and delivery materialization.

use crate::error::{Error, Result};
use crate::policy::DeliveryDecision;
use crate::storage::StorageUploader;
use crate::types::{Delivery, DownloadedMedia, MediaInfo};
use crate::utils::storage_object_name;
use tracing::{debug, info};

/// Carry out the post-flight decision for the finished file.
///
/// Runs while the working directory still exists: inline files are read
/// into memory, offloaded files are uploaded from disk.
pub(super) async fn deliver(
    decision: DeliveryDecision,
    storage: &dyn StorageUploader,
    media: DownloadedMedia,
    info: MediaInfo,
) -> Result<Delivery> {
    let extension = media
        .path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4")
        .to_string();

    match decision {
        DeliveryDecision::Inline { size } => {
            let bytes = tokio::fs::read(&media.path).await.map_err(|e| {
                Error::Extraction(format!("failed to read {}: {}", media.path.display(), e))
            })?;
            debug!(size, "delivering inline");
            Ok(Delivery::Inline {
                bytes,
                file_name: format!("video.{}", extension),
                size,
                info,
            })
        }
        DeliveryDecision::Offload { size } => {
            let object_name = storage_object_name(info.title.as_deref(), &extension);
            info!(size, object = %object_name, storage = storage.name(), "offloading to storage");
            let reference = storage.upload(&media.path, &object_name).await?;
            Ok(Delivery::Offload {
                reference,
                size,
                info,
            })
        }
        DeliveryDecision::Rejected { size, ceiling } => Err(Error::SizeRejectedPostflight {
            actual: size,
            ceiling,
        }),
    }
}
