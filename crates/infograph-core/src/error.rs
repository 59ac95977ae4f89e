//! Error types module
//!
//! The pipeline exposes a single unified error enum: every component-level
//! failure is caught at its origin, wrapped with enough context to diagnose
//! (which stage, which video), and surfaced here as a stable kind. There are
//! no internal retries; retrying is the caller's decision.

use crate::models::GeneratedArtifact;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like upstream hiccups
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "PIPELINE_TIMEOUT")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// The only thing the pipeline orchestrator returns: a finished artifact or
/// a failure tagged with a stable kind. Intermediate entities stay internal.
pub type PipelineOutcome = Result<GeneratedArtifact, PipelineError>;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Source video cannot be located or downloaded (private, deleted,
    /// geo-blocked, or malformed URL).
    #[error("video unresolvable: {0}")]
    Unresolvable(String),

    /// Network error during upload, poll, or model calls.
    #[error("upstream transport failure: {0}")]
    TransportFailure(String),

    /// Remote asset processing terminated in a failed state.
    #[error("remote processing failed: {0}")]
    ProcessingFailed(String),

    /// Synthesis produced no usable inline image part.
    #[error("image generation returned no image data")]
    NoImageReturned,

    /// Overall pipeline deadline exceeded.
    #[error("pipeline deadline of {0}s exceeded")]
    Timeout(u64),

    /// Required external credentials/config absent; surfaced before any
    /// network call is attempted.
    #[error("service not configured: {0}")]
    Unconfigured(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable,
/// suggested_action, sensitive, log_level). Keeps the ErrorMetadata impl flat;
/// client_message stays per-variant for dynamic content.
fn pipeline_error_static_metadata(
    err: &PipelineError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        PipelineError::Unresolvable(_) => (
            404,
            "VIDEO_UNRESOLVABLE",
            false,
            Some("Verify the video is public and the URL is correct"),
            false,
            LogLevel::Debug,
        ),
        PipelineError::TransportFailure(_) => (
            502,
            "UPSTREAM_TRANSPORT_FAILURE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        PipelineError::ProcessingFailed(_) => (
            502,
            "REMOTE_PROCESSING_FAILED",
            false,
            Some("Try a different video"),
            false,
            LogLevel::Warn,
        ),
        PipelineError::NoImageReturned => (
            502,
            "NO_IMAGE_RETURNED",
            true,
            Some("Retry the generation"),
            false,
            LogLevel::Warn,
        ),
        PipelineError::Timeout(_) => (
            504,
            "PIPELINE_TIMEOUT",
            true,
            Some("Retry; long videos may need several attempts"),
            false,
            LogLevel::Warn,
        ),
        PipelineError::Unconfigured(_) => (
            503,
            "SERVICE_UNCONFIGURED",
            false,
            Some("Contact the operator to configure API credentials"),
            false,
            LogLevel::Error,
        ),
        PipelineError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        PipelineError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl PipelineError {
    /// Get the error kind name for detailed error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            PipelineError::Unresolvable(_) => "Unresolvable",
            PipelineError::TransportFailure(_) => "TransportFailure",
            PipelineError::ProcessingFailed(_) => "ProcessingFailed",
            PipelineError::NoImageReturned => "NoImageReturned",
            PipelineError::Timeout(_) => "Timeout",
            PipelineError::Unconfigured(_) => "Unconfigured",
            PipelineError::InvalidInput(_) => "InvalidInput",
            PipelineError::Internal(_) => "Internal",
        }
    }
}

impl ErrorMetadata for PipelineError {
    fn http_status_code(&self) -> u16 {
        pipeline_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        pipeline_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        pipeline_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        pipeline_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        pipeline_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        pipeline_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            PipelineError::Unresolvable(ref msg) => {
                format!("Video could not be resolved: {}", msg)
            }
            PipelineError::TransportFailure(_) => {
                "Failed to reach an upstream service".to_string()
            }
            PipelineError::ProcessingFailed(_) => {
                "The remote service failed to process the video".to_string()
            }
            PipelineError::NoImageReturned => {
                "Image generation returned no image".to_string()
            }
            PipelineError::Timeout(secs) => {
                format!("Generation did not finish within {}s", secs)
            }
            PipelineError::Unconfigured(_) => {
                "Infographic generation is not configured on this server".to_string()
            }
            PipelineError::InvalidInput(ref msg) => msg.clone(),
            PipelineError::Internal(_) => "Internal server error".to_string(),
        }
    }
}
