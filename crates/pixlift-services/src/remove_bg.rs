//! remove.bg client
//!
//! One multipart POST per image. The service answers with the cut-out PNG on success and a
//! JSON `{"errors":[{"title": ...}]}` body otherwise.

use async_trait::async_trait;
use bytes::Bytes;
use pixlift_core::{AppError, RemoveBgConfig, UploadedImage};
use serde::Deserialize;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

const SERVICE_NAME: &str = "remove.bg";

/// Removes the background of an uploaded image, returning PNG bytes.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove_background(&self, image: &UploadedImage) -> Result<Bytes, AppError>;
}

/// remove.bg HTTP client
pub struct RemoveBgClient {
    http_client: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl Debug for RemoveBgClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RemoveBgClient")
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RemoveBgErrorBody {
    #[serde(default)]
    errors: Vec<RemoveBgErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct RemoveBgErrorEntry {
    title: Option<String>,
    detail: Option<String>,
}

/// Extract the human-readable detail of an error response, falling back to the raw body.
fn error_detail(body: &str) -> String {
    let titles: Vec<String> = serde_json::from_str::<RemoveBgErrorBody>(body)
        .map(|parsed| {
            parsed
                .errors
                .into_iter()
                .filter_map(|e| e.title.or(e.detail))
                .collect()
        })
        .unwrap_or_default();

    if !titles.is_empty() {
        titles.join("; ")
    } else if body.trim().is_empty() {
        "Unknown error".to_string()
    } else {
        body.trim().to_string()
    }
}

impl RemoveBgClient {
    pub fn new(config: &RemoveBgConfig, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for remove.bg: {}", e))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl BackgroundRemover for RemoveBgClient {
    async fn remove_background(&self, image: &UploadedImage) -> Result<Bytes, AppError> {
        let part = reqwest::multipart::Part::bytes(image.data.to_vec())
            .file_name(image.filename.clone())
            .mime_str(&image.content_type)
            .map_err(|e| AppError::Validation(format!("Invalid content type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("image_file", part)
            .text("size", "auto");

        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(&self.api_url)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Transport {
                service: SERVICE_NAME,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let details = error_detail(&body);
            tracing::warn!(
                status = status.as_u16(),
                details = %details,
                "remove.bg rejected the image"
            );
            return Err(AppError::BackgroundRemoval {
                status: status.as_u16(),
                details,
            });
        }

        let data = response.bytes().await.map_err(|e| AppError::Transport {
            service: SERVICE_NAME,
            message: format!("Failed to read response body: {}", e),
        })?;

        if data.is_empty() {
            return Err(AppError::BackgroundRemoval {
                status: status.as_u16(),
                details: "Empty response body".to_string(),
            });
        }

        tracing::info!(
            input_bytes = image.size(),
            output_bytes = data.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Background removed"
        );

        Ok(data)
    }
}
