//! Multipart intake for image uploads

use axum::extract::Multipart;
use pixlift_core::{AppError, UploadedImage};

/// Name of the multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Extract the single `image` field from a multipart form.
/// Other fields are ignored; a second `image` field is rejected.
pub async fn extract_image_field(mut multipart: Multipart) -> Result<UploadedImage, AppError> {
    let mut image: Option<UploadedImage> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        if image.is_some() {
            return Err(AppError::Validation(
                "Multiple image fields are not allowed; send exactly one field named 'image'"
                    .to_string(),
            ));
        }

        let filename = sanitize_filename(field.file_name().unwrap_or("upload"))?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file data: {}", e)))?;

        image = Some(UploadedImage::new(data, filename, content_type));
    }

    image.ok_or_else(|| AppError::Validation("No image provided".to_string()))
}

/// Sanitize filename to prevent path traversal and invalid characters.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    const MAX_FILENAME_LENGTH: usize = 255;

    let filename_only = std::path::Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    if filename_only.contains("..") {
        return Err(AppError::Validation(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim().is_empty() {
        return Ok("upload".to_string());
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my photo.png").unwrap(), "my_photo.png");
        assert_eq!(sanitize_filename("/tmp/evil/cat.jpg").unwrap(), "cat.jpg");
        assert_eq!(sanitize_filename("").unwrap(), "upload");
        assert!(sanitize_filename("a..png").is_err());
    }
}
