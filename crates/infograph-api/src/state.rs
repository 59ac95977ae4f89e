//! Application state shared across handlers.

use infograph_core::Config;
use infograph_pipeline::PipelineOrchestrator;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    /// `None` when GEMINI_API_KEY is absent: the server still starts and the
    /// generation endpoint answers with a structured "unconfigured" error.
    pub pipeline: Option<Arc<PipelineOrchestrator>>,
}
