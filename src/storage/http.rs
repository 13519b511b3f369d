//! HTTP object storage uploader (Firebase Storage REST API)

use super::StorageUploader;
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// Uploads files with a single media upload request
///
/// `POST {endpoint}/v0/b/{bucket}/o?uploadType=media&name={prefix}{object}`
/// with the file streamed as the body. The returned reference is the public
/// download URL built from the object's download token.
pub struct HttpStorageUploader {
    client: reqwest::Client,
    config: StorageConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: Option<String>,
    download_tokens: Option<String>,
}

impl HttpStorageUploader {
    /// Create an uploader for the configured bucket
    pub fn new(config: StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.upload_timeout)
            .build()
            .map_err(|e| Error::StorageUpload(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Full object name including the configured prefix
    pub fn full_object_name(&self, object_name: &str) -> String {
        format!("{}{}", self.config.object_prefix, object_name)
    }

    fn bucket_url(&self) -> String {
        format!(
            "{}/v0/b/{}/o",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket
        )
    }

    /// Public download URL for an uploaded object
    pub fn download_url(&self, full_name: &str, token: Option<&str>) -> String {
        let base = format!(
            "{}/{}?alt=media",
            self.bucket_url(),
            urlencoding::encode(full_name)
        );
        match token {
            Some(token) => format!("{}&token={}", base, urlencoding::encode(token)),
            None => base,
        }
    }
}

#[async_trait]
impl StorageUploader for HttpStorageUploader {
    async fn upload(&self, path: &Path, object_name: &str) -> Result<String> {
        let full_name = self.full_object_name(object_name);

        let file = tokio::fs::File::open(path).await.map_err(|e| {
            Error::StorageUpload(format!("failed to open {}: {}", path.display(), e))
        })?;
        let size = file
            .metadata()
            .await
            .map_err(|e| Error::StorageUpload(format!("failed to stat {}: {}", path.display(), e)))?
            .len();

        debug!(object = %full_name, size, "uploading to offload storage");

        let mut request = self
            .client
            .post(self.bucket_url())
            .query(&[("uploadType", "media"), ("name", full_name.as_str())])
            .header(reqwest::header::CONTENT_TYPE, content_type(path))
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)));

        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!(
                    "upload of '{}' timed out after {} seconds",
                    full_name,
                    self.config.upload_timeout.as_secs()
                )
            } else if e.is_connect() {
                format!("connection to storage failed: {}", e)
            } else {
                format!("upload of '{}' failed: {}", full_name, e)
            };
            Error::StorageUpload(message)
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::StorageUpload(format!(
                "storage returned {}: {}",
                status,
                body.trim()
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::StorageUpload(format!("unreadable upload response: {}", e)))?;

        let stored_name = uploaded.name.unwrap_or(full_name);
        // several tokens may be returned comma-separated; any of them works
        let token = uploaded
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').map(str::trim).find(|t| !t.is_empty()));
        let reference = self.download_url(&stored_name, token);

        info!(object = %stored_name, size, "uploaded to offload storage");
        Ok(reference)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mov") => "video/quicktime",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}
