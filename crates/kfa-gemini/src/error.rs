//! Gemini client error types.

use thiserror::Error;

/// Result type for Gemini operations.
pub type GeminiResult<T> = Result<T, GeminiError>;

/// Errors that can occur while talking to the model provider.
///
/// Every variant is terminal for one pipeline invocation; none of them
/// is allowed to escape as a panic.
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Upload failed after {attempts} attempts: {message}")]
    UploadFailed { message: String, attempts: u32 },

    #[error("File activation timed out after {0} seconds")]
    ActivationTimeout(u64),

    #[error("File processing failed on the provider side: {0}")]
    ActivationFailed(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("No content in model response")]
    EmptyResponse,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeminiError {
    pub fn generation_failed(msg: impl Into<String>) -> Self {
        Self::GenerationFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Returns true if a full pipeline retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UploadFailed { .. }
                | Self::ActivationTimeout(_)
                | Self::GenerationFailed(_)
                | Self::Http(_)
        )
    }
}
