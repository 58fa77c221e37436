//! Analysis lifecycle status.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Queued, waiting to start
    #[default]
    Pending,
    /// Uploading the video to the model provider
    Uploading,
    /// Model is generating the analysis
    Analyzing,
    /// Result parsed, validated, and stored
    Completed,
    /// Analysis failed at some stage
    Failed,
}

impl AnalysisStatus {
    /// Returns the status as a string for display and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns true if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the analysis is still in progress.
    pub fn is_in_progress(&self) -> bool {
        !self.is_terminal()
    }
}
