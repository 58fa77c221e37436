//! SQLite store bootstrap.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::error::DbResult;
use crate::repos::{
    AnalysisRepository, KeyframeRepository, PromptTemplateRepository, RecordingRepository,
};

/// Handle to the SQLite database.
///
/// One connection per store keeps writes serialized, which the
/// multi-table analysis insert relies on. Foreign keys are enforced on
/// every connection.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);
        let store = Self::connect(options).await?;
        info!("Opened analysis database at {}", path.as_ref().display());
        Ok(store)
    }

    /// Open an in-memory database (tests).
    pub async fn open_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn recordings(&self) -> RecordingRepository {
        RecordingRepository::new(self.pool.clone())
    }

    pub fn keyframes(&self) -> KeyframeRepository {
        KeyframeRepository::new(self.pool.clone())
    }

    pub fn analyses(&self) -> AnalysisRepository {
        AnalysisRepository::new(self.pool.clone())
    }

    pub fn templates(&self) -> PromptTemplateRepository {
        PromptTemplateRepository::new(self.pool.clone())
    }
}
