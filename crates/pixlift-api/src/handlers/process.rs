//! `POST /process`: background removal followed by enhancement.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use pixlift_core::{AppError, ProcessingResult};

use crate::error::{multipart_rejection, ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::extract_image_field;

/// Process an image
///
/// Removes the background of the uploaded image, upscales the result, and returns the URLs of
/// both artifacts. The request stays open until the enhancement job finishes or times out.
#[utoipa::path(
    post,
    path = "/process",
    tag = "processing",
    request_body(
        content_type = "multipart/form-data",
        description = "Single field `image` holding a JPEG, PNG or WebP file"
    ),
    responses(
        (status = 200, description = "Image processed", body = ProcessingResult),
        (status = 400, description = "Invalid upload or upstream rejection", body = ErrorResponse),
        (status = 408, description = "Enhancement did not finish in time", body = ErrorResponse),
        (status = 500, description = "Upstream unreachable or storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "process_image"))]
pub async fn process_image(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessingResult>, HttpAppError> {
    process(&state, multipart)
        .await
        .map(Json)
        .map_err(|e| state.http_error(e))
}

async fn process(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ProcessingResult, AppError> {
    let image = extract_image_field(multipart.map_err(multipart_rejection)?).await?;

    tracing::info!(
        filename = %image.filename,
        content_type = %image.content_type,
        size_bytes = image.size(),
        "Processing upload"
    );

    state.pipeline.run(image).await
}
