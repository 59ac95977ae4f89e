//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use infograph_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Infograph API",
        version = "0.1.0",
        description = "Generates infographic images from public videos. A single \
                       endpoint accepts a video reference, analyzes the video with a \
                       multimodal model, and returns the rendered infographic as a \
                       data URI. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::generate::generate_infographic,
        handlers::health::health,
    ),
    components(schemas(
        handlers::generate::GenerateRequest,
        handlers::generate::GenerateResponse,
        handlers::health::HealthResponse,
        error::ErrorResponse,
        models::VideoReference,
    )),
    tags(
        (name = "infographics", description = "Infographic generation"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
