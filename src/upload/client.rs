//! `reqwest` implementation of [`JobBackend`].
//!
//! All endpoints come from [`BackendConfig`]; nothing is hardcoded.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use tokio_util::io::ReaderStream;

use crate::config::BackendConfig;
use crate::preview::content_type_for;
use crate::protocol::{JobId, UploadReceipt};

use super::{HealthStatus, JobBackend, UploadError};

/// Talks to the job-processing backend over HTTP.
pub struct BackendClient {
    client: reqwest::Client,
    config: BackendConfig,
}

impl BackendClient {
    /// Build a client from application config.
    ///
    /// Only the connect phase is bounded; an upload may run as long as the
    /// transfer takes.  A default client is used if the builder fails.
    pub fn from_config(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl JobBackend for BackendClient {
    async fn upload(&self, path: &Path) -> Result<UploadReceipt, UploadError> {
        let read_error = |source: std::io::Error| UploadError::Read {
            path: path.display().to_string(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(read_error)?;
        let length = file.metadata().await.map_err(read_error)?.len();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".into());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());

        log::info!(
            "upload: streaming {file_name} ({length} bytes) to {}",
            self.config.upload_url()
        );

        // Streamed from disk so a full match recording never sits in memory.
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = multipart::Part::stream_with_length(body, length)
            .file_name(file_name)
            .mime_str(content_type_for(extension.as_deref()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.config.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("upload: backend answered {status}");
            return Err(UploadError::Status(status.as_u16()));
        }

        let receipt: UploadReceipt = response
            .json()
            .await
            .map_err(|e| UploadError::Decode(e.to_string()))?;

        if receipt.job_id.is_empty() {
            return Err(UploadError::MissingJobId);
        }

        log::info!("upload: accepted as job {}", receipt.job_id);
        Ok(receipt)
    }

    async fn health(&self) -> HealthStatus {
        let response = match self.client.get(self.config.health_url()).send().await {
            Ok(r) => r,
            Err(e) => return HealthStatus::Unreachable(e.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            return HealthStatus::Degraded(format!("HTTP {}", status.as_u16()));
        }

        match response.json::<serde_json::Value>().await {
            Ok(body) => match body["status"].as_str() {
                Some("healthy") => HealthStatus::Healthy,
                Some(other) => HealthStatus::Degraded(other.to_string()),
                None => HealthStatus::Degraded("no status field".into()),
            },
            Err(e) => HealthStatus::Degraded(e.to_string()),
        }
    }

    async fn job_status(&self, job_id: &JobId) -> Result<String, UploadError> {
        let response = self
            .client
            .get(self.config.job_status_url(job_id.as_str()))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| UploadError::Decode(e.to_string()))?;

        body["status"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| UploadError::Decode("no status field".into()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
