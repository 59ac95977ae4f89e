//! Domain models for the infographic generation pipeline.
//!
//! These are the entities that flow between pipeline stages. Everything here
//! is either created by the HTTP boundary (`VideoReference`) or produced and
//! consumed within a single pipeline run; nothing is persisted.

use base64::Engine;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A public video selected by the caller, already filtered to "public"
/// by the upstream lookup service. Consumed read-only by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoReference {
    /// Opaque external identifier (e.g. a YouTube video id).
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Title of the collection (playlist) the video was selected from.
    #[serde(default, alias = "playlistTitle")]
    pub collection_title: Option<String>,
}

impl VideoReference {
    /// Canonical watch URL handed to the analysis model.
    pub fn source_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

/// Processing state of a remote asset, as reported by the asset store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetState {
    Pending,
    Ready,
    Failed,
}

/// A media object uploaded to the remote asset store, referenced by opaque
/// URI rather than inline bytes. Owned by the pipeline run that created it
/// and discarded when the run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAsset {
    /// Resource name used for status polling (e.g. `files/abc123`).
    pub name: String,
    /// Opaque handle understood only by the remote service.
    pub uri: String,
    pub mime_type: String,
    pub state: AssetState,
}

/// A tool call issued by the analysis model: invoke the declared tool with
/// a single `url` argument. Produced by one conversation turn, consumed
/// immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub name: String,
    pub url: String,
}

/// Free-form analysis text: theme, visual style, and compositional
/// suggestions for the target image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult(String);

impl AnalysisResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terminal output of the pipeline. Ownership transfers to the caller, who
/// is responsible for any further persistence or transport encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl GeneratedArtifact {
    /// Encode as a `data:` URI, the wire form consumed by existing clients.
    pub fn data_uri(&self) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.mime_type, payload)
    }
}
