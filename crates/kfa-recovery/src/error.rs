//! Recovery parser error types.

use thiserror::Error;

/// Result type for recovery parsing.
pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Why a raw model response produced no usable report.
///
/// Both variants mean "no result" to the caller; the distinction matters
/// for logging and metrics only.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// No JSON object could be extracted from the raw text.
    #[error("No JSON object could be recovered from model output")]
    NoJson,

    /// JSON was extracted but the document violates the report schema.
    #[error("Response failed schema validation: {0}")]
    SchemaViolation(String),
}
