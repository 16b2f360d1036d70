//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`; every [`AppError`] is rendered as the same
//! `{success:false, error, code, ...}` JSON body with the status declared by its metadata.
//! Whether the error chain is attached is decided by the caller, normally through
//! [`AppState::http_error`](crate::state::AppState::http_error).

use axum::{
    extract::multipart::MultipartRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pixlift_core::{AppError, ErrorMetadata, LogLevel};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// Error detail reported by the upstream service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Error chain, development only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl ErrorResponse {
    /// `expose_trace` is ignored for sensitive errors.
    pub fn from_app_error(error: &AppError, expose_trace: bool) -> Self {
        Self {
            success: false,
            error: error.client_message(),
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
            suggested_action: error.suggested_action().map(String::from),
            details: error.details().map(String::from),
            trace: (expose_trace && !error.is_sensitive()).then(|| error.detailed_message()),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from pixlift-core)
#[derive(Debug)]
pub struct HttpAppError {
    error: AppError,
    expose_trace: bool,
}

impl HttpAppError {
    pub fn new(error: AppError, expose_trace: bool) -> Self {
        Self {
            error,
            expose_trace,
        }
    }

    pub fn error(&self) -> &AppError {
        &self.error
    }
}

/// Conversions without application state never expose the error chain.
impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError::new(err, false)
    }
}

/// A request that is not a readable multipart form is a client error.
pub fn multipart_rejection(rejection: MultipartRejection) -> AppError {
    AppError::Validation(format!(
        "Expected a multipart/form-data body: {}",
        rejection.body_text()
    ))
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.error;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = ErrorResponse::from_app_error(app_error, self.expose_trace);

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let err = AppError::BackgroundRemoval {
            status: 400,
            details: "Could not identify foreground in image".to_string(),
        };
        let body = ErrorResponse::from_app_error(&err, false);
        assert!(!body.success);
        assert_eq!(body.code, "BACKGROUND_REMOVAL_FAILED");
        assert_eq!(
            body.details.as_deref(),
            Some("Could not identify foreground in image")
        );
        assert!(body.trace.is_none());

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("trace").is_none());
        assert!(json.get("suggestedAction").is_some());
    }

    #[test]
    fn test_trace_only_when_exposed() {
        let err = AppError::EnhancementFailed {
            job_id: "pred-1".to_string(),
            reason: "CUDA out of memory".to_string(),
        };
        assert!(ErrorResponse::from_app_error(&err, false).trace.is_none());
        let body = ErrorResponse::from_app_error(&err, true);
        assert!(body.trace.unwrap().contains("pred-1"));
    }

    #[test]
    fn test_sensitive_errors_never_carry_trace() {
        let err = AppError::Transport {
            service: "remove.bg",
            message: "error sending request for url (http://127.0.0.1:9/v1.0/removebg)".to_string(),
        };
        let body = ErrorResponse::from_app_error(&err, true);
        assert_eq!(body.error, "Failed to reach remove.bg");
        assert!(body.trace.is_none());

        let body = ErrorResponse::from_app_error(&AppError::Internal("disk on fire".into()), true);
        assert_eq!(body.error, "Internal server error");
        assert!(body.trace.is_none());
    }

    #[tokio::test]
    async fn test_into_response_respects_trace_flag() {
        let err = || AppError::Validation("File too large".to_string());

        let hidden = HttpAppError::from(err()).into_response();
        let bytes = axum::body::to_bytes(hidden.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json.get("trace").is_none());

        let shown = HttpAppError::new(err(), true).into_response();
        let bytes = axum::body::to_bytes(shown.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["trace"].as_str().unwrap().contains("File too large"));
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::EnhancementTimeout {
                    attempts: 30,
                    elapsed_ms: 60_000,
                },
                StatusCode::REQUEST_TIMEOUT,
            ),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                AppError::Transport {
                    service: "Replicate",
                    message: "reset".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(HttpAppError::from(err).into_response().status(), expected);
        }
    }
}
