//! Best-effort legacy JSON mirror.
//!
//! Older builds kept analysis history in a flat `analyses.json` file;
//! readers of that file still exist. Every successful save appends a
//! coarse summary here. The mirror is never allowed to fail the main
//! write, the persister logs and moves on.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::DbResult;

/// One appended history record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorEntry {
    pub record_id: String,
    pub recording_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub keyframe_count: i64,
    pub results: Vec<MirrorResult>,
}

/// Markdown pair the legacy readers expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorResult {
    pub markdown: String,
    pub detailed: String,
}

/// Append-only JSON history file.
pub struct LegacyMirror {
    path: PathBuf,
}

impl LegacyMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one entry, preserving whatever is already in the file.
    pub async fn append(&self, entry: &MirrorEntry) -> DbResult<()> {
        let mut entries: Vec<Value> = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        entries.push(serde_json::to_value(entry)?);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&entries)?).await?;
        debug!(
            "Mirrored analysis {} to {} ({} entries)",
            entry.record_id,
            self.path.display(),
            entries.len()
        );
        Ok(())
    }
}
