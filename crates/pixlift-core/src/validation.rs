//! Upload validation
//!
//! Runs before any outbound call, so a rejected upload never costs a vendor request.

use std::path::Path;

use crate::config::UploadConfig;
use crate::error::AppError;
use crate::models::UploadedImage;

/// Size and type constraints applied to every upload.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_file_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
}

impl From<&UploadConfig> for UploadLimits {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_file_size_bytes: config.max_file_size_bytes,
            allowed_content_types: config.allowed_content_types.clone(),
        }
    }
}

impl UploadLimits {
    pub fn validate(&self, image: &UploadedImage) -> Result<(), AppError> {
        if image.size() == 0 {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        validate_file_size(image.size(), self.max_file_size_bytes)?;
        validate_content_type(&image.content_type, &self.allowed_content_types)?;
        validate_extension_content_type_match(&image.filename, &image.content_type)
            .map_err(AppError::Validation)
    }
}

/// Validate file size
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size > max_size {
        return Err(AppError::Validation(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

/// Validate content type against allowlist. Compares normalized MIME type only.
pub fn validate_content_type(content_type: &str, allowed_types: &[String]) -> Result<(), AppError> {
    let normalized = normalize_mime_type(content_type);
    if !allowed_types
        .iter()
        .any(|ct| normalized == ct.to_lowercase())
    {
        return Err(AppError::Validation(format!(
            "Invalid content type '{}'. Allowed types: {}",
            content_type,
            allowed_types.join(", ")
        )));
    }
    Ok(())
}

/// Validate that Content-Type matches the file extension.
/// Filenames without an extension are accepted as-is; the MIME allowlist still applies.
pub fn validate_extension_content_type_match(
    filename: &str,
    content_type: &str,
) -> Result<(), String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if extension.is_empty() {
        return Ok(());
    }

    let expected: &[&str] = match extension.as_str() {
        "jpg" | "jpeg" => &["image/jpeg"],
        "png" => &["image/png"],
        "webp" => &["image/webp"],
        _ => {
            return Err(format!(
                "Unsupported file extension '{}'. Expected .jpg, .jpeg, .png or .webp",
                extension
            ))
        }
    };

    let normalized = normalize_mime_type(content_type);
    if !expected.iter().any(|ct| normalized == *ct) {
        return Err(format!(
            "Content-Type '{}' does not match extension '{}'. Expected one of: {}",
            content_type,
            extension,
            expected.join(", ")
        ));
    }

    Ok(())
}
