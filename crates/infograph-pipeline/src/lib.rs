//! The infographic generation pipeline.
//!
//! One pipeline run takes a [`VideoReference`](infograph_core::models::VideoReference)
//! through five strictly sequential stages: resolve the video URL to local
//! bytes ([`fetcher`]), upload the bytes to the remote asset store and poll
//! until processed ([`uploader`]), drive the tool-call conversation with the
//! analysis model ([`broker`]), render the final image from the analysis
//! ([`synthesizer`]), all under a single wall-clock deadline ([`pipeline`]).
//!
//! External services are reached through the traits in [`model`], [`fetcher`]
//! and [`uploader`]; [`gemini`] provides the production implementations.
//! Constructor injection keeps every stage testable without network access.

pub mod broker;
pub mod fetcher;
pub mod gemini;
pub mod model;
pub mod pipeline;
pub mod synthesizer;
pub mod uploader;

pub use broker::{AnalysisError, ToolCallBroker};
pub use fetcher::{FetchError, MediaFetcher, ScratchFile, VideoSource, YtDlpFetcher};
pub use gemini::GeminiClient;
pub use model::{ChatModel, Content, ImageModel, ModelError, ModelTurn, Part, ToolDeclaration};
pub use pipeline::PipelineOrchestrator;
pub use synthesizer::{ImageSynthesizer, SynthesisError};
pub use uploader::{AssetStore, RemoteAssetUploader, StoreError, UploadError};
