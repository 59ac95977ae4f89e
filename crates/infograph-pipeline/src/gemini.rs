//! Gemini REST client: production implementation of [`ChatModel`],
//! [`ImageModel`] and [`AssetStore`].
//!
//! Three endpoints are used: `generateContent` on the analysis model for the
//! tool-call conversation, `generateContent` on the image model for
//! synthesis, and the Files API (resumable upload + metadata polling) as the
//! remote asset store. The base URL is constructor-injected so tests can
//! point the client at a local mock server.

use anyhow::Context as _;
use async_trait::async_trait;
use base64::Engine;
use infograph_core::models::{AssetState, GeneratedArtifact, RemoteAsset};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::model::{ChatModel, Content, ImageModel, ModelError, Part, Role, ToolDeclaration};
use crate::uploader::{AssetStore, StoreError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_data: Option<WireFileData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireInlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFileData {
    file_uri: String,
    mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    role: String,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<WireFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: WireContent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileMetadata,
}

fn to_wire(content: &Content) -> WireContent {
    let parts = content
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => WirePart {
                text: Some(text.clone()),
                ..Default::default()
            },
            Part::FunctionCall { name, args } => WirePart {
                function_call: Some(WireFunctionCall {
                    name: name.clone(),
                    args: args.clone(),
                }),
                ..Default::default()
            },
            Part::FunctionResponse { name, response } => WirePart {
                function_response: Some(WireFunctionResponse {
                    name: name.clone(),
                    response: response.clone(),
                }),
                ..Default::default()
            },
            Part::FileData { uri, mime_type } => WirePart {
                file_data: Some(WireFileData {
                    file_uri: uri.clone(),
                    mime_type: mime_type.clone(),
                }),
                ..Default::default()
            },
        })
        .collect();
    WireContent {
        role: content.role.as_str().to_string(),
        parts,
    }
}

fn from_wire(wire: WireContent) -> Content {
    let role = if wire.role == "user" {
        Role::User
    } else {
        Role::Model
    };
    let parts = wire
        .parts
        .into_iter()
        .filter_map(|part| {
            if let Some(call) = part.function_call {
                Some(Part::FunctionCall {
                    name: call.name,
                    args: call.args,
                })
            } else if let Some(data) = part.file_data {
                Some(Part::FileData {
                    uri: data.file_uri,
                    mime_type: data.mime_type,
                })
            } else {
                part.text.map(Part::Text)
            }
        })
        .collect();
    Content { role, parts }
}

fn asset_from_metadata(meta: FileMetadata) -> RemoteAsset {
    let state = match meta.state.as_str() {
        "ACTIVE" => AssetState::Ready,
        "FAILED" => AssetState::Failed,
        // PROCESSING, STATE_UNSPECIFIED, and anything newer: keep polling.
        _ => AssetState::Pending,
    };
    RemoteAsset {
        name: meta.name,
        uri: meta.uri,
        mime_type: meta.mime_type,
        state,
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    analysis_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        analysis_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            analysis_model: analysis_model.into(),
            image_model: image_model.into(),
        })
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ModelError> {
        let url = format!("{}/v1beta/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn send(
        &self,
        history: &[Content],
        tools: &[ToolDeclaration],
    ) -> Result<Content, ModelError> {
        let request = GenerateContentRequest {
            contents: history.iter().map(to_wire).collect(),
            tools: if tools.is_empty() {
                None
            } else {
                Some(vec![WireTool {
                    function_declarations: tools
                        .iter()
                        .map(|t| WireFunctionDeclaration {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        })
                        .collect(),
                }])
            },
        };

        let mut response = self.generate_content(&self.analysis_model, &request).await?;
        if response.candidates.is_empty() {
            return Err(ModelError::Malformed(
                "response contained no candidates".to_string(),
            ));
        }
        Ok(from_wire(response.candidates.remove(0).content))
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedArtifact, ModelError> {
        let request = GenerateContentRequest {
            contents: vec![WireContent {
                role: "user".to_string(),
                parts: vec![WirePart {
                    text: Some(prompt.to_string()),
                    ..Default::default()
                }],
            }],
            tools: None,
        };

        let response = self.generate_content(&self.image_model, &request).await?;

        let inline = response
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .find_map(|part| part.inline_data)
            .ok_or(ModelError::NoImage)?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| ModelError::Malformed(format!("invalid image base64: {}", e)))?;

        let mime_type = if inline.mime_type.is_empty() {
            "image/png".to_string()
        } else {
            inline.mime_type
        };
        Ok(GeneratedArtifact { bytes, mime_type })
    }
}

#[async_trait]
impl AssetStore for GeminiClient {
    /// Resumable upload in the two-step form the Files API expects: a
    /// metadata `start` request that yields a session URL, then a single
    /// `upload, finalize` request carrying the bytes.
    async fn upload(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteAsset, StoreError> {
        let start_url = format!("{}/upload/v1beta/files", self.base_url);

        let start = self
            .client
            .post(&start_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = start.status();
        if !status.is_success() {
            let message = start.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session_url = start
            .headers()
            .get("X-Goog-Upload-URL")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                StoreError::Protocol("upload start response missing session URL".to_string())
            })?
            .to_string();

        let finalize = self
            .client
            .post(&session_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(data)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = finalize.status();
        if !status.is_success() {
            let message = finalize.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded = finalize
            .json::<UploadResponse>()
            .await
            .map_err(|e| StoreError::Protocol(format!("invalid upload response: {}", e)))?;
        Ok(asset_from_metadata(uploaded.file))
    }

    async fn get_state(&self, name: &str) -> Result<RemoteAsset, StoreError> {
        let url = format!("{}/v1beta/{}", self.base_url, name);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let meta = response
            .json::<FileMetadata>()
            .await
            .map_err(|e| StoreError::Protocol(format!("invalid file metadata: {}", e)))?;
        Ok(asset_from_metadata(meta))
    }
}
