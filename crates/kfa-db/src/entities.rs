//! Persisted entity rows.
//!
//! These mirror the relational schema one-to-one. The model-facing
//! report contract lives in kfa-models; rows carry storage concerns
//! (ids, timestamps, status) the contract does not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The original captured video asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Recording {
    pub record_id: String,
    pub original_video_path: String,
    pub title: String,
    pub description: String,
    pub duration_seconds: i64,
    pub file_size_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recording {
    /// Create a new recording row for a video path.
    pub fn new(original_video_path: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            record_id: Uuid::new_v4().to_string(),
            original_video_path: original_video_path.into(),
            title: title.into(),
            description: String::new(),
            duration_seconds: 0,
            file_size_bytes: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A compacted video built from detected keyframes of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct KeyFrameVideo {
    pub keyframe_id: String,
    pub recording_id: String,
    pub keyframe_video_path: String,
    pub keyframe_count: i64,
    pub duration_seconds: i64,
    pub file_size_bytes: i64,
    pub compression_ratio: f64,
    pub created_at: DateTime<Utc>,
}

impl KeyFrameVideo {
    pub fn new(
        recording_id: impl Into<String>,
        keyframe_video_path: impl Into<String>,
        keyframe_count: i64,
    ) -> Self {
        Self {
            keyframe_id: Uuid::new_v4().to_string(),
            recording_id: recording_id.into(),
            keyframe_video_path: keyframe_video_path.into(),
            keyframe_count,
            duration_seconds: 0,
            file_size_bytes: 0,
            compression_ratio: 0.0,
            created_at: Utc::now(),
        }
    }
}

/// One completed model-generated result for a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AiAnalysis {
    pub analysis_id: String,
    pub recording_id: String,
    pub keyframe_id: Option<String>,
    pub prompt_id: Option<String>,
    pub model_name: String,
    pub status: String,
    pub video_analysis_md: String,
    pub audio_analysis_md: Option<String>,
    pub summary_md: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_time_ms: i64,
    pub error_message: Option<String>,
}

/// A stored timeline annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TimestampEventRow {
    pub event_id: String,
    pub analysis_id: String,
    pub timestamp_seconds: f64,
    pub event_type: String,
    pub title: String,
    pub description: Option<String>,
    pub importance_score: i64,
}

/// A stored scored finding. `related_timestamps` is a JSON array of
/// seconds, stored as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct KeyFindingRow {
    pub finding_id: String,
    pub analysis_id: String,
    pub sequence_order: i64,
    pub category: String,
    pub title: String,
    pub content: String,
    pub related_timestamps: String,
    pub confidence_score: i64,
}

impl KeyFindingRow {
    /// Decode the stored timestamp list.
    pub fn timestamps(&self) -> Vec<f64> {
        serde_json::from_str(&self.related_timestamps).unwrap_or_default()
    }
}

/// A stored typed metadata entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MetadataRow {
    pub metadata_id: String,
    pub analysis_id: String,
    pub key: String,
    pub value: String,
    pub data_type: Option<String>,
}

/// An analysis with all of its child rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDetails {
    pub analysis: AiAnalysis,
    pub events: Vec<TimestampEventRow>,
    pub findings: Vec<KeyFindingRow>,
    pub metadata: Vec<MetadataRow>,
}
