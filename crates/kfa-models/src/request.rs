//! Analysis request and probed video context.

use std::collections::HashMap;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Facts about the input video, gathered by the media probe.
///
/// Every field is optional: the prompt assembler renders only the facts
/// that are present and omits the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoContext {
    /// Duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// Number of detected keyframes in the compacted video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyframe_count: Option<u32>,

    /// File size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,

    /// Frame width in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Frame height in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl VideoContext {
    /// Returns true if no facts are present.
    pub fn is_empty(&self) -> bool {
        self.duration_seconds.is_none()
            && self.keyframe_count.is_none()
            && self.file_size_bytes.is_none()
            && self.width.is_none()
            && self.height.is_none()
    }

    /// File size in mebibytes, if known.
    pub fn file_size_mb(&self) -> Option<f64> {
        self.file_size_bytes.map(|b| b as f64 / (1024.0 * 1024.0))
    }
}

/// One invocation of the analysis pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Recording the analysis belongs to
    pub recording_id: String,

    /// Path to the keyframe video to analyze
    pub video_path: PathBuf,

    /// Scenario category selecting the default task template
    pub category: String,

    /// Probed facts about the video, if available
    pub context: Option<VideoContext>,

    /// Values substituted into `{name}` template placeholders
    pub variables: HashMap<String, String>,
}

impl AnalysisRequest {
    /// Create a request with the default "general" category.
    pub fn new(recording_id: impl Into<String>, video_path: impl Into<PathBuf>) -> Self {
        Self {
            recording_id: recording_id.into(),
            video_path: video_path.into(),
            category: "general".to_string(),
            context: None,
            variables: HashMap::new(),
        }
    }

    /// Set the scenario category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Attach probed video context.
    pub fn with_context(mut self, context: VideoContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Set a template variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}
