use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, Json};
use infograph_core::models::VideoReference;
use infograph_core::PipelineError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    pub video: VideoReference,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// The generated infographic as a `data:` URI.
    pub image_url: String,
}

#[utoipa::path(
    post,
    path = "/api/v0/infographics",
    tag = "infographics",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Infographic generated", body = GenerateResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Video could not be resolved", body = ErrorResponse),
        (status = 502, description = "Upstream service failure", body = ErrorResponse),
        (status = 503, description = "Service not configured", body = ErrorResponse),
        (status = 504, description = "Generation deadline exceeded", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        video_id = %request.video.id,
        video_title = %request.video.title,
        operation = "generate_infographic"
    )
)]
pub async fn generate_infographic(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, HttpAppError> {
    if request.video.id.trim().is_empty() {
        return Err(HttpAppError::from(PipelineError::InvalidInput(
            "video.id is required".to_string(),
        )));
    }
    if request.video.title.trim().is_empty() {
        return Err(HttpAppError::from(PipelineError::InvalidInput(
            "video.title is required".to_string(),
        )));
    }

    let pipeline = state.pipeline.as_ref().ok_or_else(|| {
        HttpAppError::from(PipelineError::Unconfigured(
            "GEMINI_API_KEY is not set".to_string(),
        ))
    })?;

    let artifact = pipeline.run(request.video.clone()).await?;

    tracing::info!(
        size_bytes = artifact.bytes.len(),
        mime_type = %artifact.mime_type,
        "Infographic generated"
    );

    Ok(Json(GenerateResponse {
        image_url: artifact.data_uri(),
    }))
}
