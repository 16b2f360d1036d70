//! Replicate client for Real-ESRGAN upscaling
//!
//! Predictions are created with the background-removed PNG inlined as a base64 data URI
//! and then observed through the `urls.get` link the API hands back.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use pixlift_core::{AppError, EnhancementJob, JobSnapshot, JobStatus, ReplicateConfig};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

const SERVICE_NAME: &str = "Replicate";
const UPSCALE_FACTOR: u32 = 2;

/// Submits images for enhancement and observes the resulting remote job.
#[async_trait]
pub trait ImageEnhancer: Send + Sync {
    /// Create a remote job for the given PNG.
    async fn submit(&self, png: &Bytes) -> Result<EnhancementJob, AppError>;

    /// Fetch the current state of a job.
    async fn fetch_job(&self, job: &EnhancementJob) -> Result<JobSnapshot, AppError>;
}

/// Replicate HTTP client
pub struct ReplicateClient {
    http_client: reqwest::Client,
    api_token: String,
    api_base: String,
    model_version: String,
}

impl Debug for ReplicateClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ReplicateClient")
            .field("api_base", &self.api_base)
            .field("model_version", &self.model_version)
            .finish()
    }
}

// Replicate API structures
#[derive(Debug, Serialize)]
struct CreatePredictionRequest<'a> {
    version: &'a str,
    input: PredictionInput,
}

#[derive(Debug, Serialize)]
struct PredictionInput {
    image: String,
    scale: u32,
    face_enhance: bool,
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    #[serde(default)]
    id: String,
    status: Option<JobStatus>,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplicateErrorBody {
    detail: Option<String>,
}

/// Output is either a single URL or a list whose first entry is the image.
fn output_url(output: Option<&serde_json::Value>) -> Option<String> {
    match output? {
        serde_json::Value::String(url) if !url.is_empty() => Some(url.clone()),
        serde_json::Value::Array(items) => items
            .iter()
            .find_map(|v| v.as_str().filter(|s| !s.is_empty()).map(str::to_string)),
        _ => None,
    }
}

fn error_text(error: Option<serde_json::Value>) -> Option<String> {
    match error? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn error_detail(body: &str) -> String {
    serde_json::from_str::<ReplicateErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "Unknown error".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

impl ReplicateClient {
    pub fn new(config: &ReplicateConfig, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for Replicate: {}", e))?;

        Ok(Self {
            http_client,
            api_token: config.api_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model_version: config.model_version.clone(),
        })
    }

    fn transport_error(e: reqwest::Error) -> AppError {
        AppError::Transport {
            service: SERVICE_NAME,
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl ImageEnhancer for ReplicateClient {
    async fn submit(&self, png: &Bytes) -> Result<EnhancementJob, AppError> {
        let url = format!("{}/predictions", self.api_base);
        let request = CreatePredictionRequest {
            version: &self.model_version,
            input: PredictionInput {
                image: format!("data:image/png;base64,{}", STANDARD.encode(png)),
                scale: UPSCALE_FACTOR,
                face_enhance: false,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(Self::transport_error)?;

        if !status.is_success() {
            let details = error_detail(&body);
            tracing::warn!(
                status = status.as_u16(),
                details = %details,
                "Replicate rejected the prediction"
            );
            return Err(AppError::EnhancementSubmit {
                status: status.as_u16(),
                details,
            });
        }

        let prediction: PredictionResponse =
            serde_json::from_str(&body).map_err(|e| AppError::EnhancementSubmit {
                status: status.as_u16(),
                details: format!("Malformed prediction response: {}", e),
            })?;

        let poll_url = prediction
            .urls
            .and_then(|u| u.get)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                AppError::InvalidServiceResponse(
                    "Prediction response is missing urls.get".to_string(),
                )
            })?;

        tracing::info!(
            prediction_id = %prediction.id,
            input_bytes = png.len(),
            "Replicate prediction created"
        );

        Ok(EnhancementJob {
            id: prediction.id,
            poll_url,
        })
    }

    async fn fetch_job(&self, job: &EnhancementJob) -> Result<JobSnapshot, AppError> {
        let response = self
            .http_client
            .get(&job.poll_url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::InvalidServiceResponse(format!(
                "Prediction status request returned {}: {}",
                status.as_u16(),
                error_detail(&body)
            )));
        }

        let body = response.text().await.map_err(Self::transport_error)?;
        let prediction: PredictionResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::InvalidServiceResponse(format!("Malformed prediction status: {}", e))
        })?;

        let status = prediction.status.ok_or_else(|| {
            AppError::InvalidServiceResponse("Prediction status is missing".to_string())
        })?;

        Ok(JobSnapshot {
            status,
            output: output_url(prediction.output.as_ref()),
            error: error_text(prediction.error),
        })
    }
}
