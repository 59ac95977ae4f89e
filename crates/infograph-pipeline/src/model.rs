//! Conversation primitives for the analysis and image models.
//!
//! The pipeline talks to models through [`ChatModel`] and [`ImageModel`];
//! both are object-safe so tests can inject stubs and production wires in
//! [`crate::gemini::GeminiClient`].

use async_trait::async_trait;
use infograph_core::models::{GeneratedArtifact, ToolInvocation};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("transport failure calling model: {0}")]
    Transport(String),

    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed model response: {0}")]
    Malformed(String),

    #[error("model response contained no image part")]
    NoImage,
}

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One piece of a conversation turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    FunctionCall {
        name: String,
        args: serde_json::Value,
    },
    FunctionResponse {
        name: String,
        response: serde_json::Value,
    },
    /// Remote asset reference the model can consume as media.
    FileData {
        uri: String,
        mime_type: String,
    },
}

/// One exchange unit within a multi-turn session.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::Text(text.into())])
    }
}

/// A callable action declared to the model: name, description, and a JSON
/// schema for its parameters.
#[derive(Debug, Clone)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// What the model did with its turn, decoded as a tagged variant rather
/// than ad hoc branches on a dynamically typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    ToolCall(ToolInvocation),
    Text(String),
}

impl ModelTurn {
    /// Interpret a model turn: the first function call wins; otherwise all
    /// text parts are concatenated. A function call without a string `url`
    /// argument is malformed.
    pub fn from_content(content: &Content) -> Result<Self, ModelError> {
        for part in &content.parts {
            if let Part::FunctionCall { name, args } = part {
                let url = args
                    .get("url")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        ModelError::Malformed(format!(
                            "function call '{}' missing string argument 'url'",
                            name
                        ))
                    })?
                    .to_string();
                return Ok(ModelTurn::ToolCall(ToolInvocation {
                    name: name.clone(),
                    url,
                }));
            }
        }

        let text: String = content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ModelTurn::Text(text))
    }
}

/// A conversational model that may answer with text or a tool call.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the full history plus tool declarations; returns the model's
    /// next turn.
    async fn send(
        &self,
        history: &[Content],
        tools: &[ToolDeclaration],
    ) -> Result<Content, ModelError>;
}

/// A generation model producing a single image from a prompt.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedArtifact, ModelError>;
}
