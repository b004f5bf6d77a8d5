//! HTTP side of the backend: video upload, health check and job status.
//!
//! This module provides:
//! * [`JobBackend`]: async trait the session orchestrator talks to.
//! * [`BackendClient`]: `reqwest` implementation against the real API.
//! * [`UploadError`] / [`HealthStatus`].
//!
//! Uploads are a single attempt.  There is no retry or backoff; the user
//! retries by picking the file again.

pub mod client;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::{JobId, UploadReceipt};

pub use client::BackendClient;

// ---------------------------------------------------------------------------
// UploadError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the backend over HTTP.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The selected file could not be read from disk.
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP transport or connection error.
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-2xx status.
    #[error("Upload failed (HTTP {0})")]
    Status(u16),

    /// The response body was not the JSON we expected.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The response parsed but carried an empty `job_id`.
    #[error("response did not contain a job id")]
    MissingJobId,
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        UploadError::Request(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// HealthStatus
// ---------------------------------------------------------------------------

/// Result of probing `GET /health`.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    /// The backend reported `{"status":"healthy"}`.
    Healthy,
    /// The backend answered, but not with a healthy status.
    Degraded(String),
    /// The backend could not be reached.
    Unreachable(String),
}

impl HealthStatus {
    pub fn label(&self) -> String {
        match self {
            HealthStatus::Healthy => "Backend healthy".into(),
            HealthStatus::Degraded(detail) => format!("Backend degraded: {detail}"),
            HealthStatus::Unreachable(detail) => format!("Backend unreachable: {detail}"),
        }
    }
}

// ---------------------------------------------------------------------------
// JobBackend trait
// ---------------------------------------------------------------------------

/// The HTTP operations the session needs from the backend.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn JobBackend>`.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Upload the video at `path` as multipart field `file` and return the
    /// receipt carrying the job id.
    async fn upload(&self, path: &Path) -> Result<UploadReceipt, UploadError>;

    /// Query the backend's liveness endpoint.  Never fails; problems are
    /// folded into the returned status.
    async fn health(&self) -> HealthStatus;

    /// Ask the backend for the processing status of `job_id`.
    async fn job_status(&self, job_id: &JobId) -> Result<String, UploadError>;
}
