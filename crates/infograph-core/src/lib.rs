//! Core types shared across the infograph workspace: configuration,
//! the unified pipeline error type, and the domain models that flow
//! through the generation pipeline.

pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{ErrorMetadata, LogLevel, PipelineError, PipelineOutcome};
