//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use pixlift_core::models;

/// Returns the OpenAPI spec served at `/api/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pixlift API",
        version = "0.1.0",
        description = "Background removal and AI upscaling of uploaded images"
    ),
    paths(
        handlers::process::process_image,
        handlers::uploads::get_upload,
        handlers::health::health_check,
    ),
    components(schemas(
        models::ProcessingResult,
        error::ErrorResponse,
        handlers::health::HealthResponse,
        handlers::health::ServiceStatus,
    )),
    tags(
        (name = "processing", description = "Image processing pipeline"),
        (name = "artifacts", description = "Stored intermediate artifacts"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
