//! Pipeline orchestration: run analysis then synthesis under one deadline.
//!
//! The run body executes in its own task so the deadline can cancel it at
//! any await point. Cancellation drops in-flight guards (notably the scratch
//! file), so an aborted run leaves nothing behind locally. Remote assets
//! staged before an abort are left to the store's own retention policy.

use std::sync::Arc;
use std::time::Duration;

use infograph_core::error::{PipelineError, PipelineOutcome};
use infograph_core::models::VideoReference;

use crate::broker::{AnalysisError, ToolCallBroker};
use crate::model::ModelError;
use crate::synthesizer::{ImageSynthesizer, SynthesisError};

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Transport(msg) => PipelineError::TransportFailure(msg),
            ModelError::Api { status, message } => {
                PipelineError::TransportFailure(format!("model API error ({}): {}", status, message))
            }
            ModelError::Malformed(msg) => PipelineError::Internal(msg),
            ModelError::NoImage => PipelineError::NoImageReturned,
        }
    }
}

impl From<AnalysisError> for PipelineError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Model(e) => e.into(),
            AnalysisError::Fetch(e) => match e {
                crate::fetcher::FetchError::Unresolvable { url, detail } => {
                    PipelineError::Unresolvable(format!("{} ({})", url, detail))
                }
                crate::fetcher::FetchError::Io(e) => e.into(),
            },
            AnalysisError::Upload(e) => match e {
                crate::uploader::UploadError::TransportFailure(msg) => {
                    PipelineError::TransportFailure(msg)
                }
                crate::uploader::UploadError::ProcessingFailed(msg) => {
                    PipelineError::ProcessingFailed(msg)
                }
                crate::uploader::UploadError::Scratch(e) => e.into(),
            },
            AnalysisError::UnknownTool(name) => {
                PipelineError::Internal(format!("model requested unknown tool '{}'", name))
            }
            AnalysisError::EmptyAnalysis => {
                PipelineError::Internal("model returned an empty analysis".to_string())
            }
            AnalysisError::UnexpectedToolCall => {
                PipelineError::Internal("model requested a second tool call".to_string())
            }
        }
    }
}

impl From<SynthesisError> for PipelineError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::Model(e) => e.into(),
            SynthesisError::NoImageReturned => PipelineError::NoImageReturned,
        }
    }
}

/// Runs the full generation pipeline for one video under a wall-clock
/// deadline. Stateless between runs; safe to share behind an `Arc` across
/// concurrent requests.
pub struct PipelineOrchestrator {
    broker: Arc<ToolCallBroker>,
    synthesizer: Arc<ImageSynthesizer>,
    deadline: Duration,
}

impl PipelineOrchestrator {
    pub fn new(
        broker: Arc<ToolCallBroker>,
        synthesizer: Arc<ImageSynthesizer>,
        deadline: Duration,
    ) -> Self {
        Self {
            broker,
            synthesizer,
            deadline,
        }
    }

    /// Run analysis then synthesis for `video`. Exceeding the deadline
    /// aborts the run task mid-flight and returns `Timeout`; a panic inside
    /// the run is contained and surfaced as `Internal`.
    #[tracing::instrument(skip(self, video), fields(video_id = %video.id, title = %video.title))]
    pub async fn run(&self, video: VideoReference) -> PipelineOutcome {
        let broker = Arc::clone(&self.broker);
        let synthesizer = Arc::clone(&self.synthesizer);
        let deadline_secs = self.deadline.as_secs();

        tracing::info!(deadline_secs, "Starting infographic pipeline");

        let mut task = tokio::spawn(async move {
            let analysis = broker.analyze(&video).await?;
            tracing::info!(analysis_chars = analysis.as_str().len(), "Analysis complete");
            let artifact = synthesizer.synthesize(&analysis, &video).await?;
            Ok::<_, PipelineError>(artifact)
        });

        match tokio::time::timeout(self.deadline, &mut task).await {
            Ok(Ok(outcome)) => {
                if let Err(err) = &outcome {
                    tracing::warn!(error = %err, kind = err.error_type(), "Pipeline failed");
                }
                outcome
            }
            Ok(Err(join_err)) => {
                if join_err.is_panic() {
                    tracing::error!("Pipeline task panicked");
                    Err(PipelineError::Internal(
                        "pipeline task panicked".to_string(),
                    ))
                } else {
                    Err(PipelineError::Internal(
                        "pipeline task was cancelled".to_string(),
                    ))
                }
            }
            Err(_) => {
                tracing::warn!(deadline_secs, "Pipeline deadline exceeded, aborting run");
                task.abort();
                // Await the aborted task so its drop handlers (scratch file
                // cleanup) have run before we report the timeout.
                let _ = task.await;
                Err(PipelineError::Timeout(deadline_secs))
            }
        }
    }
}
