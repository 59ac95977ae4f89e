//! Tool-call broker: drives the conversation with the analysis model.
//!
//! The model cannot fetch arbitrary URLs itself, so it is offered one tool
//! that downloads a video and stages it in the remote asset store. The
//! broker executes at most one such call per run, then resumes the same
//! conversation with the tool result plus the staged asset attached, so the
//! model's final answer is grounded in the real content.

use std::sync::Arc;

use infograph_core::models::{AnalysisResult, VideoReference};
use serde_json::json;
use thiserror::Error;

use crate::fetcher::{FetchError, MediaFetcher};
use crate::model::{ChatModel, Content, ModelError, ModelTurn, Part, ToolDeclaration};
use crate::uploader::{RemoteAssetUploader, UploadError};

/// The single tool declared to the analysis model.
pub const DOWNLOAD_VIDEO_TOOL: &str = "download_video";

const UPLOAD_MIME_TYPE: &str = "video/mp4";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("tool execution failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("tool execution failed: {0}")]
    Upload(#[from] UploadError),

    #[error("model requested unknown tool '{0}'")]
    UnknownTool(String),

    #[error("model returned an empty analysis")]
    EmptyAnalysis,

    #[error("model requested a second tool call after receiving the asset")]
    UnexpectedToolCall,
}

pub struct ToolCallBroker {
    model: Arc<dyn ChatModel>,
    fetcher: MediaFetcher,
    uploader: RemoteAssetUploader,
}

impl ToolCallBroker {
    pub fn new(
        model: Arc<dyn ChatModel>,
        fetcher: MediaFetcher,
        uploader: RemoteAssetUploader,
    ) -> Self {
        Self {
            model,
            fetcher,
            uploader,
        }
    }

    fn tool_declaration() -> ToolDeclaration {
        ToolDeclaration {
            name: DOWNLOAD_VIDEO_TOOL.to_string(),
            description: "Downloads a video from a given URL and stages it for analysis. \
                          Returns the staged file URI and MIME type."
                .to_string(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "url": {
                        "type": "STRING",
                        "description": "The full video URL to download.",
                    },
                },
                "required": ["url"],
            }),
        }
    }

    fn analysis_prompt(video: &VideoReference) -> String {
        format!(
            "You are an expert visual designer.\n\
             Analyze the video at this URL: {}\n\n\
             First, use the '{}' tool to access the video content.\n\n\
             Once you have access to the video, analyze it to determine:\n\
             1. The core theme and key topics.\n\
             2. The visual style, color palette, and mood of the video.\n\
             3. Key imagery or scenes that would make a compelling infographic.\n\n\
             Output a detailed description for an infographic that summarizes this video.\n\
             Focus on visual elements that can be passed to an image generation model.",
            video.source_url(),
            DOWNLOAD_VIDEO_TOOL,
        )
    }

    /// Run the analysis conversation for one video.
    ///
    /// State machine: the first model turn is either a tool call (execute
    /// it, resume with the asset, expect text) or direct text (the model
    /// chose not to inspect the raw video; supported fallback). A requested
    /// but failed tool call is a hard error, never a silent fallback.
    #[tracing::instrument(skip(self, video), fields(video_id = %video.id))]
    pub async fn analyze(&self, video: &VideoReference) -> Result<AnalysisResult, AnalysisError> {
        let tools = [Self::tool_declaration()];
        let mut history = vec![Content::user_text(Self::analysis_prompt(video))];

        tracing::info!("Requesting video analysis");
        let first_reply = self.model.send(&history, &tools).await?;

        let invocation = match ModelTurn::from_content(&first_reply)? {
            ModelTurn::Text(text) => {
                // The model declined the tool; use its text-only analysis.
                tracing::warn!("Model did not call the tool, using text-only analysis");
                return finalize(text);
            }
            ModelTurn::ToolCall(invocation) => invocation,
        };

        if invocation.name != DOWNLOAD_VIDEO_TOOL {
            return Err(AnalysisError::UnknownTool(invocation.name));
        }

        tracing::info!(url = %invocation.url, "Model requested video download");
        let scratch = self.fetcher.fetch(&invocation.url).await?;
        let asset = self
            .uploader
            .upload_and_await_ready(
                scratch,
                UPLOAD_MIME_TYPE,
                &format!("Video {}", video.id),
            )
            .await?;

        history.push(first_reply);
        history.push(Content::user(vec![
            Part::FunctionResponse {
                name: DOWNLOAD_VIDEO_TOOL.to_string(),
                response: json!({
                    "fileUri": asset.uri,
                    "mimeType": asset.mime_type,
                    "status": "success",
                }),
            },
            Part::FileData {
                uri: asset.uri.clone(),
                mime_type: asset.mime_type.clone(),
            },
            Part::Text(
                "Here is the video file. Please proceed with the visual analysis \
                 for the infographic."
                    .to_string(),
            ),
        ]));

        tracing::info!(asset_uri = %asset.uri, "Resuming conversation with staged asset");
        let second_reply = self.model.send(&history, &tools).await?;

        match ModelTurn::from_content(&second_reply)? {
            ModelTurn::Text(text) => finalize(text),
            ModelTurn::ToolCall(_) => Err(AnalysisError::UnexpectedToolCall),
        }
    }
}

fn finalize(text: String) -> Result<AnalysisResult, AnalysisError> {
    let result = AnalysisResult::new(text);
    if result.is_empty() {
        return Err(AnalysisError::EmptyAnalysis);
    }
    Ok(result)
}
