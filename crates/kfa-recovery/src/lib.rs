//! Recovery parsing for unreliable model output.
//!
//! The model's response is assumed untrustworthy: it may wrap the JSON in
//! a fenced code block, embed raw newlines inside string values, emit
//! numbers as strings, or drift out of the documented ranges. [`parse`]
//! rehabilitates such output in stages:
//!
//! 1. fenced-block extraction when the reply is wrapped in a code fence
//! 2. physical-newline repair inside string values
//! 3. strict JSON decoding, with a fenced-extraction fallback
//! 4. field-level sanitization (coercion, defaults, clamping)
//! 5. typed deserialization plus schema constraint validation
//!
//! The crate does no I/O and never panics on arbitrary input. A response
//! that survives all five stages comes out as a typed
//! [`AnalysisReport`]; anything else is an error the caller treats as
//! "no result".

mod error;
mod extract;
mod sanitize;

use kfa_models::AnalysisReport;
use serde_json::Value;
use tracing::{debug, warn};
use validator::Validate;

pub use error::{RecoveryError, RecoveryResult};

/// Parse raw model output into a validated report.
pub fn parse(raw_text: &str) -> RecoveryResult<AnalysisReport> {
    let mut doc = extract_document(raw_text).ok_or_else(|| {
        warn!(
            "No JSON object recovered from response (first 200 chars): {}",
            sample(raw_text)
        );
        RecoveryError::NoJson
    })?;

    sanitize::sanitize(&mut doc);
    validate_typed(doc)
}

/// Stages 1-3: produce a decoded JSON document or nothing.
fn extract_document(raw_text: &str) -> Option<Value> {
    let trimmed = raw_text.trim();

    // Replies that open with a code fence carry the object inside it.
    let candidate = if trimmed.starts_with("```") {
        extract::extract_fenced(trimmed).unwrap_or_else(|| trimmed.to_string())
    } else {
        trimmed.to_string()
    };

    let repaired = extract::repair_newlines(&candidate);
    if let Ok(doc) = serde_json::from_str::<Value>(&repaired) {
        return Some(doc);
    }

    // The fence may appear mid-reply, after conversational preamble.
    let fenced = extract::extract_fenced(raw_text)?;
    let repaired = extract::repair_newlines(&fenced);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(doc) => Some(doc),
        Err(e) => {
            debug!("Fenced fallback also failed to decode: {e}");
            None
        }
    }
}

/// Stage 5: typed deserialization plus constraint checks.
fn validate_typed(doc: Value) -> RecoveryResult<AnalysisReport> {
    let report: AnalysisReport = serde_json::from_value(doc).map_err(|e| {
        warn!("Response JSON does not match the report schema: {e}");
        RecoveryError::SchemaViolation(e.to_string())
    })?;

    if let Err(errors) = report.validate() {
        for (field, kinds) in errors.field_errors() {
            for kind in kinds {
                warn!(
                    "Schema constraint violated at {field}: {} (value: {:?})",
                    kind.code,
                    kind.params.get("value")
                );
            }
        }
        return Err(RecoveryError::SchemaViolation(errors.to_string()));
    }

    Ok(report)
}

fn sample(text: &str) -> String {
    text.chars().take(200).collect()
}
