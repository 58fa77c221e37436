//! The multi-table result write.

use std::collections::HashSet;

use chrono::Utc;
use metrics::counter;
use sqlx::sqlite::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use kfa_models::{AnalysisReport, AnalysisStatus};

use crate::error::DbResult;
use crate::mirror::{LegacyMirror, MirrorEntry, MirrorResult};
use crate::repos::KeyframeRepository;
use crate::store::SqliteStore;

/// Writes one validated report across the relational schema.
///
/// The analysis row and all of its children go in a single
/// transaction; a failed insert rolls everything back so a partial
/// analysis is never visible. A re-run for the same recording creates
/// a new analysis row rather than updating the old one.
pub struct ResultPersister {
    pool: SqlitePool,
    model_name: String,
    mirror: Option<LegacyMirror>,
}

impl ResultPersister {
    pub fn new(store: &SqliteStore, model_name: impl Into<String>) -> Self {
        Self {
            pool: store.pool().clone(),
            model_name: model_name.into(),
            mirror: None,
        }
    }

    /// Also mirror each save into the legacy JSON history file.
    pub fn with_mirror(mut self, mirror: LegacyMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Persist a report for a recording. Returns the new analysis id.
    pub async fn save(&self, recording_id: &str, report: &AnalysisReport) -> DbResult<String> {
        let keyframe = KeyframeRepository::new(self.pool.clone())
            .latest_for_recording(recording_id)
            .await?;
        if keyframe.is_none() {
            warn!("No keyframe video found for recording {recording_id}; saving without one");
        }

        let analysis_id = Uuid::new_v4().to_string();
        // The write is instantaneous from this layer's point of view;
        // upstream timing is tracked by the pipeline.
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO ai_analysis (analysis_id, recording_id, keyframe_id, model_name, \
             status, video_analysis_md, audio_analysis_md, summary_md, started_at, \
             completed_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&analysis_id)
        .bind(recording_id)
        .bind(keyframe.as_ref().map(|k| k.keyframe_id.as_str()))
        .bind(&self.model_name)
        .bind(AnalysisStatus::Completed.as_str())
        .bind(&report.video_analysis_markdown)
        .bind(&report.audio_analysis_markdown)
        .bind(&report.summary_markdown)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for event in &report.timestamp_events {
            sqlx::query(
                "INSERT INTO timestamp_event (event_id, analysis_id, timestamp_seconds, \
                 event_type, title, description, importance_score) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&analysis_id)
            .bind(event.timestamp_seconds)
            .bind(event.event_type.as_str())
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.importance_score)
            .execute(&mut *tx)
            .await?;
        }

        for (index, finding) in report.key_findings.iter().enumerate() {
            let sequence = finding
                .sequence_order
                .map(i64::from)
                .unwrap_or(index as i64);
            sqlx::query(
                "INSERT INTO key_finding (finding_id, analysis_id, sequence_order, category, \
                 title, content, related_timestamps, confidence_score) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&analysis_id)
            .bind(sequence)
            .bind(finding.category.as_str())
            .bind(&finding.title)
            .bind(&finding.content)
            .bind(serde_json::to_string(&finding.related_timestamps)?)
            .bind(finding.confidence_score)
            .execute(&mut *tx)
            .await?;
        }

        let mut seen_keys = HashSet::new();
        for entry in &report.analysis_metadata {
            if !seen_keys.insert(entry.key.as_str()) {
                warn!("Duplicate metadata key '{}' dropped", entry.key);
                continue;
            }
            sqlx::query(
                "INSERT INTO analysis_metadata (metadata_id, analysis_id, key, value, \
                 data_type) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&analysis_id)
            .bind(&entry.key)
            .bind(entry.value_as_string())
            .bind(&entry.data_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        counter!("kfa_analyses_saved_total").increment(1);
        info!(
            "Saved analysis {analysis_id} for recording {recording_id} \
             ({} events, {} findings)",
            report.timestamp_events.len(),
            report.key_findings.len()
        );

        if let Some(mirror) = &self.mirror {
            let entry = MirrorEntry {
                record_id: analysis_id.clone(),
                recording_id: recording_id.to_string(),
                started_at: now,
                completed_at: now,
                keyframe_count: keyframe.map(|k| k.keyframe_count).unwrap_or(0),
                results: vec![MirrorResult {
                    markdown: report.summary_markdown.clone(),
                    detailed: report.video_analysis_markdown.clone(),
                }],
            };
            if let Err(e) = mirror.append(&entry).await {
                counter!("kfa_mirror_failures_total").increment(1);
                warn!("Legacy mirror write failed (ignored): {e}");
            }
        }

        Ok(analysis_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{KeyFrameVideo, Recording};
    use kfa_models::{
        EventType, FindingCategory, KeyFinding, MetadataEntry, TimestampEvent,
    };

    fn report() -> AnalysisReport {
        AnalysisReport {
            video_analysis_markdown: "# Full analysis".to_string(),
            audio_analysis_markdown: Some("# Audio".to_string()),
            summary_markdown: "Two notable moments in this session.".to_string(),
            key_findings: vec![
                KeyFinding {
                    sequence_order: None,
                    category: FindingCategory::Technical,
                    title: "first".to_string(),
                    content: "body".to_string(),
                    confidence_score: 90,
                    related_timestamps: vec![1.0, 2.5],
                },
                KeyFinding {
                    sequence_order: Some(7),
                    category: FindingCategory::Other("narrative".to_string()),
                    title: "second".to_string(),
                    content: "body".to_string(),
                    confidence_score: 60,
                    related_timestamps: vec![],
                },
            ],
            timestamp_events: vec![TimestampEvent {
                timestamp_seconds: 3.5,
                event_type: EventType::Highlight,
                title: "event".to_string(),
                description: None,
                importance_score: 8,
            }],
            analysis_metadata: vec![
                MetadataEntry {
                    key: "tone".to_string(),
                    value: serde_json::json!("focused"),
                    data_type: Some("string".to_string()),
                },
                MetadataEntry {
                    key: "tone".to_string(),
                    value: serde_json::json!("duplicate"),
                    data_type: None,
                },
            ],
        }
    }

    async fn seeded_store() -> (SqliteStore, String) {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let recording = Recording::new("/videos/session.mp4", "Session");
        store.recordings().create(&recording).await.unwrap();
        let keyframe = KeyFrameVideo::new(&recording.record_id, "/kf/session.mp4", 24);
        store.keyframes().create(&keyframe).await.unwrap();
        (store, recording.record_id)
    }

    async fn count(store: &SqliteStore, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(store.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_writes_all_child_rows() {
        let (store, recording_id) = seeded_store().await;
        let persister = ResultPersister::new(&store, "gemini-2.5-flash");

        let analysis_id = persister.save(&recording_id, &report()).await.unwrap();

        let details = store
            .analyses()
            .latest_details_for_recording(&recording_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.analysis.analysis_id, analysis_id);
        assert_eq!(details.analysis.model_name, "gemini-2.5-flash");
        assert_eq!(details.analysis.status, "completed");
        assert!(details.analysis.keyframe_id.is_some());
        assert_eq!(details.events.len(), 1);
        assert_eq!(details.findings.len(), 2);
        // Duplicate metadata key is dropped, first wins.
        assert_eq!(details.metadata.len(), 1);
        assert_eq!(details.metadata[0].value, "focused");
    }

    #[tokio::test]
    async fn test_sequence_order_defaults_to_index() {
        let (store, recording_id) = seeded_store().await;
        let persister = ResultPersister::new(&store, "m");
        persister.save(&recording_id, &report()).await.unwrap();

        let details = store
            .analyses()
            .latest_details_for_recording(&recording_id)
            .await
            .unwrap()
            .unwrap();
        let orders: Vec<i64> = details.findings.iter().map(|f| f.sequence_order).collect();
        assert_eq!(orders, vec![0, 7]);
        assert_eq!(details.findings[0].timestamps(), vec![1.0, 2.5]);
    }

    #[tokio::test]
    async fn test_save_without_keyframe_leaves_link_null() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let recording = Recording::new("/videos/bare.mp4", "bare");
        store.recordings().create(&recording).await.unwrap();

        let persister = ResultPersister::new(&store, "m");
        persister.save(&recording.record_id, &report()).await.unwrap();

        let details = store
            .analyses()
            .latest_details_for_recording(&recording.record_id)
            .await
            .unwrap()
            .unwrap();
        assert!(details.analysis.keyframe_id.is_none());
    }

    #[tokio::test]
    async fn test_save_for_unknown_recording_rolls_back() {
        let (store, _) = seeded_store().await;
        let persister = ResultPersister::new(&store, "m");

        assert!(persister.save("no-such-recording", &report()).await.is_err());
        // The analysis row for the failed save must not exist.
        assert_eq!(count(&store, "ai_analysis").await, 0);
        assert_eq!(count(&store, "timestamp_event").await, 0);
    }

    #[tokio::test]
    async fn test_recording_delete_cascades_through_analysis() {
        let (store, recording_id) = seeded_store().await;
        let persister = ResultPersister::new(&store, "m");
        persister.save(&recording_id, &report()).await.unwrap();

        assert!(store.recordings().delete(&recording_id).await.unwrap());

        for table in [
            "recording",
            "keyframe_video",
            "ai_analysis",
            "timestamp_event",
            "key_finding",
            "analysis_metadata",
        ] {
            assert_eq!(count(&store, table).await, 0, "{table} not cascaded");
        }
    }

    #[tokio::test]
    async fn test_reanalysis_creates_second_row() {
        let (store, recording_id) = seeded_store().await;
        let persister = ResultPersister::new(&store, "m");

        let first = persister.save(&recording_id, &report()).await.unwrap();
        let second = persister.save(&recording_id, &report()).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(count(&store, "ai_analysis").await, 2);
    }

    #[tokio::test]
    async fn test_mirror_receives_summary() {
        let (store, recording_id) = seeded_store().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses.json");
        let persister =
            ResultPersister::new(&store, "m").with_mirror(LegacyMirror::new(&path));

        persister.save(&recording_id, &report()).await.unwrap();

        let entries: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["recording_id"], recording_id);
        assert_eq!(entries[0]["keyframe_count"], 24);
        assert_eq!(entries[0]["results"][0]["detailed"], "# Full analysis");
    }
}
