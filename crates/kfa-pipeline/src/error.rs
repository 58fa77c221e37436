//! Pipeline error taxonomy.

use thiserror::Error;

use kfa_db::DbError;
use kfa_gemini::GeminiError;
use kfa_media::MediaError;
use kfa_recovery::RecoveryError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// One error kind per pipeline stage.
///
/// Nothing here is allowed to escape as a panic; every stage failure is
/// reported through this enum and the worker loop keeps running.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input file is missing, oversized, or unsupported.
    /// User-correctable; never retried.
    #[error("Input error: {0}")]
    Input(#[from] MediaError),

    /// The model call failed (upload, activation, or generation).
    #[error("Model error: {0}")]
    Model(#[from] GeminiError),

    /// The response could not be recovered into a valid report.
    #[error("No result: {0}")]
    NoResult(#[from] RecoveryError),

    /// The validated report could not be written.
    #[error("Persistence error: {0}")]
    Persistence(#[from] DbError),

    /// The worker loop has shut down.
    #[error("Analysis worker unavailable")]
    WorkerUnavailable,
}

impl PipelineError {
    /// True when re-running the whole pipeline could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Model(e) => e.is_retryable(),
            Self::Persistence(_) => true,
            Self::Input(_) | Self::NoResult(_) | Self::WorkerUnavailable => false,
        }
    }

    /// Stage label used in logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Model(_) => "model",
            Self::NoResult(_) => "recovery",
            Self::Persistence(_) => "persistence",
            Self::WorkerUnavailable => "worker",
        }
    }
}
