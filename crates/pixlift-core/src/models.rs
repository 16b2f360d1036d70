//! Request-scoped domain models for the processing pipeline.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An image received from a client, held in memory for the lifetime of one request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub data: Bytes,
    pub filename: String,
    pub content_type: String,
}

impl UploadedImage {
    pub fn new(
        data: impl Into<Bytes>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Output of the background removal stage.
#[derive(Debug, Clone)]
pub struct BackgroundRemovalResult {
    /// PNG bytes with the background made transparent
    pub data: Bytes,
    /// Generated artifact name, `removed_<uuid>.png`
    pub filename: String,
}

impl BackgroundRemovalResult {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            filename: format!("removed_{}.png", uuid::Uuid::new_v4()),
        }
    }
}

/// Remote job status as reported by the enhancement service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "starting")]
    Queued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Handle on a submitted enhancement job. Only the polling URL is held locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancementJob {
    pub id: String,
    pub poll_url: String,
}

/// One observation of a remote job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    /// Output URL, present once the job succeeded
    pub output: Option<String>,
    /// Failure reason reported by the service
    pub error: Option<String>,
}

/// Terminal success response of `POST /process`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    /// Always `true`; failures are reported as an error response instead
    pub success: bool,
    /// Public URL of the background-removed PNG
    #[schema(example = "/uploads/removed_0b7f3d1e-4c1a-4a8e-9f0e-1c2d3e4f5a6b.png")]
    pub removed_bg_url: String,
    /// URL of the enhanced image returned by the enhancement service
    pub enhanced_url: String,
    /// Remote job id
    pub prediction_id: String,
    pub processing_time_ms: u64,
}

impl ProcessingResult {
    pub fn succeeded(
        removed_bg_url: String,
        enhanced_url: String,
        prediction_id: String,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            success: true,
            removed_bg_url,
            enhanced_url,
            prediction_id,
            processing_time_ms,
        }
    }
}
