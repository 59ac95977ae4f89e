//! Image synthesis stage: turn the analysis text into the final infographic.

use std::sync::Arc;

use infograph_core::models::{AnalysisResult, GeneratedArtifact, VideoReference};
use thiserror::Error;

use crate::model::{ImageModel, ModelError};

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Model(ModelError),

    #[error("image model returned no image data")]
    NoImageReturned,
}

impl From<ModelError> for SynthesisError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NoImage => SynthesisError::NoImageReturned,
            other => SynthesisError::Model(other),
        }
    }
}

pub struct ImageSynthesizer {
    model: Arc<dyn ImageModel>,
}

impl ImageSynthesizer {
    pub fn new(model: Arc<dyn ImageModel>) -> Self {
        Self { model }
    }

    /// Build the rendering prompt and call the image model once.
    #[tracing::instrument(skip(self, analysis, video), fields(video_id = %video.id))]
    pub async fn synthesize(
        &self,
        analysis: &AnalysisResult,
        video: &VideoReference,
    ) -> Result<GeneratedArtifact, SynthesisError> {
        let prompt = Self::render_prompt(analysis, video);
        tracing::info!(prompt_chars = prompt.len(), "Requesting infographic image");
        let artifact = self.model.generate_image(&prompt).await?;
        tracing::info!(
            size_bytes = artifact.bytes.len(),
            mime_type = %artifact.mime_type,
            "Infographic image generated"
        );
        Ok(artifact)
    }

    fn render_prompt(analysis: &AnalysisResult, video: &VideoReference) -> String {
        let mut prompt = format!(
            "Create a visually stunning infographic based on this analysis:\n\n{}\n\n\
             The infographic is for a video titled \"{}\".",
            analysis, video.title,
        );
        if let Some(collection) = &video.collection_title {
            prompt.push_str(&format!(" It belongs to the collection \"{}\".", collection));
        }
        prompt.push_str(
            "\n\nDesign requirements:\n\
             - Modern, clean, and professional layout.\n\
             - Vibrant colors and engaging typography.\n\
             - The video title should be featured prominently.\n\
             - Summarize the key points visually, not as walls of text.",
        );
        prompt
    }
}
