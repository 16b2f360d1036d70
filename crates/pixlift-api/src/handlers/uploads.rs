//! `GET /uploads/{filename}`: serves stored artifacts.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use pixlift_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

fn is_valid_artifact_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit('.').next().map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Download an artifact
#[utoipa::path(
    get,
    path = "/uploads/{filename}",
    tag = "artifacts",
    params(("filename" = String, Path, description = "Artifact name, e.g. removed_<uuid>.png")),
    responses(
        (status = 200, description = "Artifact bytes with an image content type"),
        (status = 400, description = "Invalid file name", body = ErrorResponse),
        (status = 404, description = "Artifact not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_upload"))]
pub async fn get_upload(
    Path(filename): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, HttpAppError> {
    serve_artifact(&state, &filename)
        .await
        .map_err(|e| state.http_error(e))
}

async fn serve_artifact(state: &AppState, filename: &str) -> Result<Response, AppError> {
    if !is_valid_artifact_name(filename) {
        return Err(AppError::Validation("Invalid file name".to_string()));
    }

    let data = state.storage.download(filename).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(filename))
        .header(header::CONTENT_LENGTH, data.len())
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from(data))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            AppError::Internal(e.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_name_rules() {
        assert!(is_valid_artifact_name("removed_0b7f3d1e-4c1a.png"));
        assert!(!is_valid_artifact_name("..%2Fetc%2Fpasswd"));
        assert!(!is_valid_artifact_name("a..png"));
        assert!(!is_valid_artifact_name("sub/dir.png"));
        assert!(!is_valid_artifact_name(""));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("removed_x.png"), "image/png");
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }
}
