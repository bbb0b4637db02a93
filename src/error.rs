//! Error types for the frame pipeline.

use thiserror::Error;

/// Boxed collaborator error carried as an error source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by pipeline setup and by individual cycles.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline could not be assembled. Not recoverable.
    #[error("pipeline setup failed: {0}")]
    Setup(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The detector failed; the cycle is aborted.
    #[error("detector failed")]
    Detection(#[source] BoxError),

    /// The visual tracker failed; the cycle is aborted.
    #[error("tracker failed")]
    Tracking(#[source] BoxError),

    #[error("pipeline has been shut down")]
    Shutdown,

    /// The worker thread died outside a guarded cycle.
    #[error("pipeline worker panicked")]
    WorkerPanicked,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Whether the error only affects the current cycle.
    pub fn is_per_cycle(&self) -> bool {
        matches!(self, Self::Detection(_) | Self::Tracking(_))
    }
}

/// Why a recognition request produced no text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("no observation")]
    NoObservation,

    #[error("recognition error: {0}")]
    Failed(String),

    #[error("recognition timed out")]
    TimedOut,

    #[error("recognition cancelled")]
    Cancelled,
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
