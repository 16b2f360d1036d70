//! Error types module
//!
//! Every failure of the processing pipeline is expressed as an [`AppError`]. Each variant
//! describes its own HTTP presentation through [`ErrorMetadata`], so the API layer maps
//! errors without knowing which stage produced them.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for upstream service rejections and timeouts
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "BACKGROUND_REMOVAL_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Failed to reach {service}: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("Background removal failed with status {status}: {details}")]
    BackgroundRemoval { status: u16, details: String },

    #[error("Enhancement submission failed with status {status}: {details}")]
    EnhancementSubmit { status: u16, details: String },

    #[error("Invalid service response: {0}")]
    InvalidServiceResponse(String),

    #[error("Enhancement job {job_id} failed: {reason}")]
    EnhancementFailed { job_id: String, reason: String },

    #[error("Enhancement timed out after {attempts} polls ({elapsed_ms} ms)")]
    EnhancementTimeout { attempts: u32, elapsed_ms: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidServiceResponse(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Validation(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check the upload and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Transport { .. } => (
            500,
            "UPSTREAM_UNREACHABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::BackgroundRemoval { .. } => (
            400,
            "BACKGROUND_REMOVAL_FAILED",
            false,
            Some("Check the image content and try a different file"),
            false,
            LogLevel::Warn,
        ),
        AppError::EnhancementSubmit { .. } => (
            400,
            "ENHANCEMENT_SUBMIT_FAILED",
            false,
            Some("Check the image and try again"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidServiceResponse(_) => (
            400,
            "INVALID_SERVICE_RESPONSE",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::EnhancementFailed { .. } => (
            400,
            "ENHANCEMENT_FAILED",
            false,
            Some("Try a different image"),
            false,
            LogLevel::Warn,
        ),
        AppError::EnhancementTimeout { .. } => (
            408,
            "ENHANCEMENT_TIMEOUT",
            true,
            Some("Retry later or with a smaller image"),
            false,
            LogLevel::Warn,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the file name"),
            false,
            LogLevel::Debug,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::Transport { .. } => "Transport",
            AppError::BackgroundRemoval { .. } => "BackgroundRemoval",
            AppError::EnhancementSubmit { .. } => "EnhancementSubmit",
            AppError::InvalidServiceResponse(_) => "InvalidServiceResponse",
            AppError::EnhancementFailed { .. } => "EnhancementFailed",
            AppError::EnhancementTimeout { .. } => "EnhancementTimeout",
            AppError::NotFound(_) => "NotFound",
            AppError::Storage(_) => "Storage",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Upstream service detail, surfaced to clients as `details`.
    pub fn details(&self) -> Option<&str> {
        match self {
            AppError::BackgroundRemoval { details, .. }
            | AppError::EnhancementSubmit { details, .. } => Some(details),
            AppError::EnhancementFailed { reason, .. } => Some(reason),
            AppError::InvalidServiceResponse(msg) => Some(msg),
            _ => None,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(ref msg) => msg.clone(),
            AppError::Transport { service, .. } => format!("Failed to reach {}", service),
            AppError::BackgroundRemoval { .. } => "Failed to remove background".to_string(),
            AppError::EnhancementSubmit { .. } => "Failed to submit image for enhancement".to_string(),
            AppError::InvalidServiceResponse(_) => {
                "Unexpected response from enhancement service".to_string()
            }
            AppError::EnhancementFailed { .. } => "Image enhancement failed".to_string(),
            AppError::EnhancementTimeout { attempts, .. } => {
                format!("Enhancement did not complete after {} status checks", attempts)
            }
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
