//! Structured analysis report contract.
//!
//! This is the shape the model is asked to emit. Recovery parsing
//! (kfa-recovery) coerces unreliable output into these types; anything
//! that still fails the constraints here is discarded, never stored.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Category of a key finding.
///
/// Unknown categories are preserved verbatim rather than rejected; the
/// schema enumerates the known values but the model is free to invent
/// new ones and downstream consumers treat the category as advisory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FindingCategory {
    Technical,
    Action,
    Visual,
    Other(String),
}

impl FindingCategory {
    /// Returns the category as a string for display and storage.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Technical => "technical",
            Self::Action => "action",
            Self::Visual => "visual",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Returns true if this is one of the documented categories.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for FindingCategory {
    fn from(s: String) -> Self {
        match s.as_str() {
            "technical" => Self::Technical,
            "action" => Self::Action,
            "visual" => Self::Visual,
            _ => Self::Other(s),
        }
    }
}

impl From<FindingCategory> for String {
    fn from(c: FindingCategory) -> Self {
        c.as_str().to_string()
    }
}

// Serialized as a plain string, so the schema is one too.
impl JsonSchema for FindingCategory {
    fn schema_name() -> String {
        "FindingCategory".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

/// Type of a timestamped event.
///
/// Same pass-through policy as [`FindingCategory`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Technical,
    Action,
    Visual,
    Highlight,
    Other(String),
}

impl EventType {
    /// Returns the event type as a string for display and storage.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Technical => "technical",
            Self::Action => "action",
            Self::Visual => "visual",
            Self::Highlight => "highlight",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Returns true if this is one of the documented event types.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "technical" => Self::Technical,
            "action" => Self::Action,
            "visual" => Self::Visual,
            "highlight" => Self::Highlight,
            _ => Self::Other(s),
        }
    }
}

impl From<EventType> for String {
    fn from(e: EventType) -> Self {
        e.as_str().to_string()
    }
}

impl JsonSchema for EventType {
    fn schema_name() -> String {
        "EventType".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

/// A scored, categorized observation extracted from the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct KeyFinding {
    /// Position within the findings list; defaults to the array index
    /// at persistence time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_order: Option<u32>,

    /// Finding category (technical, action, visual, or free-form)
    pub category: FindingCategory,

    /// Short finding title
    pub title: String,

    /// Finding body text
    pub content: String,

    /// Confidence in [0, 100]; sanitization clamps out-of-range values
    #[validate(range(min = 0, max = 100))]
    pub confidence_score: i64,

    /// Timestamps (seconds) this finding refers to
    #[serde(default)]
    #[validate(custom(function = "validate_non_negative_seconds"))]
    pub related_timestamps: Vec<f64>,
}

/// A point-in-time annotation within the source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimestampEvent {
    /// Offset into the video in seconds
    #[validate(range(min = 0.0))]
    pub timestamp_seconds: f64,

    /// Event type (technical, action, visual, highlight, or free-form)
    pub event_type: EventType,

    /// Short event title
    pub title: String,

    /// Longer event description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Importance in [1, 10]; sanitization clamps out-of-range values
    #[validate(range(min = 1, max = 10))]
    pub importance_score: i64,
}

/// A typed key/value entry attached to an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEntry {
    /// Entry key, unique per analysis
    pub key: String,

    /// String, number, or null
    pub value: serde_json::Value,

    /// Optional declared type of `value` (e.g. "string", "number")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl MetadataEntry {
    /// Render the value as a plain string for storage.
    pub fn value_as_string(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// A complete, validated analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Main analysis document (markdown)
    pub video_analysis_markdown: String,

    /// Audio/dialogue analysis (markdown), if the video has audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_analysis_markdown: Option<String>,

    /// One-line summary for list display
    #[validate(length(min = 10))]
    pub summary_markdown: String,

    /// Scored findings
    #[validate(nested)]
    pub key_findings: Vec<KeyFinding>,

    /// Timeline annotations
    #[validate(nested)]
    pub timestamp_events: Vec<TimestampEvent>,

    /// Free-form typed metadata
    #[serde(default)]
    pub analysis_metadata: Vec<MetadataEntry>,
}

fn validate_non_negative_seconds(timestamps: &[f64]) -> Result<(), ValidationError> {
    if timestamps.iter().any(|t| *t < 0.0 || !t.is_finite()) {
        return Err(ValidationError::new("negative_timestamp"));
    }
    Ok(())
}
