//! Typed repositories over the relational schema.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tracing::info;
use uuid::Uuid;

use kfa_prompt::{PromptTemplate, TemplateError, TemplateStore, TemplateVariable};

use crate::entities::{
    AiAnalysis, AnalysisDetails, KeyFindingRow, KeyFrameVideo, MetadataRow, Recording,
    TimestampEventRow,
};
use crate::error::DbResult;

/// Repository for source recordings.
pub struct RecordingRepository {
    pool: SqlitePool,
}

impl RecordingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new recording row.
    pub async fn create(&self, recording: &Recording) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO recording (record_id, original_video_path, title, description, \
             duration_seconds, file_size_bytes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&recording.record_id)
        .bind(&recording.original_video_path)
        .bind(&recording.title)
        .bind(&recording.description)
        .bind(recording.duration_seconds)
        .bind(recording.file_size_bytes)
        .bind(recording.created_at)
        .bind(recording.updated_at)
        .execute(&self.pool)
        .await?;
        info!("Created recording record: {}", recording.record_id);
        Ok(())
    }

    pub async fn get(&self, record_id: &str) -> DbResult<Option<Recording>> {
        let row = sqlx::query_as::<_, Recording>(
            "SELECT * FROM recording WHERE record_id = ?",
        )
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<Recording>> {
        let rows = sqlx::query_as::<_, Recording>(
            "SELECT * FROM recording ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Update title/description and bump `updated_at`.
    pub async fn update_details(
        &self,
        record_id: &str,
        title: &str,
        description: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE recording SET title = ?, description = ?, updated_at = ? \
             WHERE record_id = ?",
        )
        .bind(title)
        .bind(description)
        .bind(Utc::now())
        .bind(record_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a recording; cascades to every derived row.
    pub async fn delete(&self, record_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM recording WHERE record_id = ?")
            .bind(record_id)
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted recording {record_id} and descendants");
        }
        Ok(deleted)
    }
}

/// Repository for compacted keyframe videos.
pub struct KeyframeRepository {
    pool: SqlitePool,
}

impl KeyframeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, keyframe: &KeyFrameVideo) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO keyframe_video (keyframe_id, recording_id, keyframe_video_path, \
             keyframe_count, duration_seconds, file_size_bytes, compression_ratio, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&keyframe.keyframe_id)
        .bind(&keyframe.recording_id)
        .bind(&keyframe.keyframe_video_path)
        .bind(keyframe.keyframe_count)
        .bind(keyframe.duration_seconds)
        .bind(keyframe.file_size_bytes)
        .bind(keyframe.compression_ratio)
        .bind(keyframe.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_recording(&self, recording_id: &str) -> DbResult<Vec<KeyFrameVideo>> {
        let rows = sqlx::query_as::<_, KeyFrameVideo>(
            "SELECT * FROM keyframe_video WHERE recording_id = ? ORDER BY created_at DESC",
        )
        .bind(recording_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// The most recently created keyframe video for a recording.
    pub async fn latest_for_recording(
        &self,
        recording_id: &str,
    ) -> DbResult<Option<KeyFrameVideo>> {
        let row = sqlx::query_as::<_, KeyFrameVideo>(
            "SELECT * FROM keyframe_video WHERE recording_id = ? \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(recording_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Read-side repository for stored analyses.
pub struct AnalysisRepository {
    pool: SqlitePool,
}

impl AnalysisRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, analysis_id: &str) -> DbResult<Option<AiAnalysis>> {
        let row = sqlx::query_as::<_, AiAnalysis>(
            "SELECT * FROM ai_analysis WHERE analysis_id = ?",
        )
        .bind(analysis_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_for_recording(&self, recording_id: &str) -> DbResult<Vec<AiAnalysis>> {
        let rows = sqlx::query_as::<_, AiAnalysis>(
            "SELECT * FROM ai_analysis WHERE recording_id = ? ORDER BY completed_at DESC",
        )
        .bind(recording_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// The latest completed analysis for a recording, with all children.
    pub async fn latest_details_for_recording(
        &self,
        recording_id: &str,
    ) -> DbResult<Option<AnalysisDetails>> {
        let analysis = sqlx::query_as::<_, AiAnalysis>(
            "SELECT * FROM ai_analysis WHERE recording_id = ? AND status = 'completed' \
             ORDER BY completed_at DESC LIMIT 1",
        )
        .bind(recording_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(analysis) = analysis else {
            return Ok(None);
        };
        Ok(Some(self.load_details(analysis).await?))
    }

    async fn load_details(&self, analysis: AiAnalysis) -> DbResult<AnalysisDetails> {
        let events = sqlx::query_as::<_, TimestampEventRow>(
            "SELECT * FROM timestamp_event WHERE analysis_id = ? ORDER BY timestamp_seconds",
        )
        .bind(&analysis.analysis_id)
        .fetch_all(&self.pool)
        .await?;

        let findings = sqlx::query_as::<_, KeyFindingRow>(
            "SELECT * FROM key_finding WHERE analysis_id = ? ORDER BY sequence_order",
        )
        .bind(&analysis.analysis_id)
        .fetch_all(&self.pool)
        .await?;

        let metadata = sqlx::query_as::<_, MetadataRow>(
            "SELECT * FROM analysis_metadata WHERE analysis_id = ? ORDER BY key",
        )
        .bind(&analysis.analysis_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(AnalysisDetails {
            analysis,
            events,
            findings,
            metadata,
        })
    }
}

/// Repository for persisted prompt templates.
///
/// Implements the lookup seam the prompt assembler consumes.
pub struct PromptTemplateRepository {
    pool: SqlitePool,
}

impl PromptTemplateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a template. Setting `is_default` clears the
    /// flag on the category's previous default.
    pub async fn save(&self, template: &PromptTemplate) -> DbResult<()> {
        let variables = serde_json::to_string(&template.variables)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        if template.is_default {
            sqlx::query(
                "UPDATE prompt_template SET is_default = 0 WHERE category = ?",
            )
            .bind(&template.category)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query(
            "INSERT INTO prompt_template (prompt_id, name, prompt_content, category, \
             is_default, variables, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(prompt_id) DO UPDATE SET \
             name = excluded.name, prompt_content = excluded.prompt_content, \
             category = excluded.category, is_default = excluded.is_default, \
             variables = excluded.variables, updated_at = excluded.updated_at",
        )
        .bind(&template.prompt_id)
        .bind(&template.name)
        .bind(&template.content)
        .bind(&template.category)
        .bind(template.is_default as i64)
        .bind(&variables)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get(&self, prompt_id: &str) -> DbResult<Option<PromptTemplate>> {
        let row = sqlx::query_as::<_, TemplateRow>(
            "SELECT prompt_id, name, prompt_content, category, is_default, variables \
             FROM prompt_template WHERE prompt_id = ?",
        )
        .bind(prompt_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TemplateRow::into_template).transpose()
    }

    pub async fn default_for(&self, category: &str) -> DbResult<Option<PromptTemplate>> {
        let row = sqlx::query_as::<_, TemplateRow>(
            "SELECT prompt_id, name, prompt_content, category, is_default, variables \
             FROM prompt_template WHERE category = ? AND is_default = 1 LIMIT 1",
        )
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TemplateRow::into_template).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct TemplateRow {
    prompt_id: String,
    name: String,
    prompt_content: String,
    category: String,
    is_default: i64,
    variables: String,
}

impl TemplateRow {
    fn into_template(self) -> DbResult<PromptTemplate> {
        let variables: Vec<TemplateVariable> = serde_json::from_str(&self.variables)?;
        Ok(PromptTemplate {
            prompt_id: self.prompt_id,
            name: self.name,
            category: self.category,
            content: self.prompt_content,
            is_default: self.is_default != 0,
            variables,
        })
    }
}

#[async_trait]
impl TemplateStore for PromptTemplateRepository {
    async fn default_for_category(
        &self,
        category: &str,
    ) -> Result<Option<PromptTemplate>, TemplateError> {
        self.default_for(category)
            .await
            .map_err(|e| TemplateError::StoreUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use chrono::Duration;

    async fn store() -> SqliteStore {
        SqliteStore::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_recording_roundtrip() {
        let store = store().await;
        let recording = Recording::new("/videos/session.mp4", "Session");
        store.recordings().create(&recording).await.unwrap();

        let loaded = store
            .recordings()
            .get(&recording.record_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.original_video_path, "/videos/session.mp4");
        assert_eq!(loaded.title, "Session");
    }

    #[tokio::test]
    async fn test_update_details() {
        let store = store().await;
        let recording = Recording::new("/videos/a.mp4", "old");
        store.recordings().create(&recording).await.unwrap();

        let updated = store
            .recordings()
            .update_details(&recording.record_id, "new", "desc")
            .await
            .unwrap();
        assert!(updated);

        let loaded = store
            .recordings()
            .get(&recording.record_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.title, "new");
        assert_eq!(loaded.description, "desc");
    }

    #[tokio::test]
    async fn test_latest_keyframe_wins() {
        let store = store().await;
        let recording = Recording::new("/videos/a.mp4", "a");
        store.recordings().create(&recording).await.unwrap();

        let mut older = KeyFrameVideo::new(&recording.record_id, "/kf/old.mp4", 10);
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = KeyFrameVideo::new(&recording.record_id, "/kf/new.mp4", 12);

        store.keyframes().create(&older).await.unwrap();
        store.keyframes().create(&newer).await.unwrap();

        let latest = store
            .keyframes()
            .latest_for_recording(&recording.record_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.keyframe_video_path, "/kf/new.mp4");

        let all = store
            .keyframes()
            .list_for_recording(&recording.record_id)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_keyframe_requires_existing_recording() {
        let store = store().await;
        let orphan = KeyFrameVideo::new("missing-recording", "/kf/x.mp4", 1);
        assert!(store.keyframes().create(&orphan).await.is_err());
    }

    #[tokio::test]
    async fn test_template_save_and_default_lookup() {
        let store = store().await;
        let repo = store.templates();

        let template = PromptTemplate {
            prompt_id: "t1".to_string(),
            name: "coding default".to_string(),
            category: "coding".to_string(),
            content: "Focus on {focus}.".to_string(),
            is_default: true,
            variables: vec![TemplateVariable {
                name: "focus".to_string(),
                default: "the workflow".to_string(),
            }],
        };
        repo.save(&template).await.unwrap();

        let loaded = repo.default_for("coding").await.unwrap().unwrap();
        assert_eq!(loaded, template);
        assert!(repo.default_for("gaming").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_default_replaces_previous() {
        let store = store().await;
        let repo = store.templates();

        let first = PromptTemplate {
            prompt_id: "t1".to_string(),
            name: "v1".to_string(),
            category: "coding".to_string(),
            content: "one".to_string(),
            is_default: true,
            variables: vec![],
        };
        let second = PromptTemplate {
            prompt_id: "t2".to_string(),
            name: "v2".to_string(),
            category: "coding".to_string(),
            content: "two".to_string(),
            is_default: true,
            variables: vec![],
        };
        repo.save(&first).await.unwrap();
        repo.save(&second).await.unwrap();

        let loaded = repo.default_for("coding").await.unwrap().unwrap();
        assert_eq!(loaded.prompt_id, "t2");
        assert!(!repo.get("t1").await.unwrap().unwrap().is_default);
    }

    #[tokio::test]
    async fn test_template_store_trait_surface() {
        let store = store().await;
        let repo = store.templates();
        let template = PromptTemplate {
            prompt_id: "t1".to_string(),
            name: "n".to_string(),
            category: "general".to_string(),
            content: "body".to_string(),
            is_default: true,
            variables: vec![],
        };
        repo.save(&template).await.unwrap();

        let via_trait: &dyn TemplateStore = &repo;
        let found = via_trait.default_for_category("general").await.unwrap();
        assert_eq!(found.unwrap().content, "body");
    }
}
