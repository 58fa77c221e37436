//! SQLite persistence for the keyframe analysis backend.
//!
//! Owns the relational schema (recordings, keyframe videos, prompt
//! templates, analyses and their children), typed repositories over it,
//! the single-transaction result write, and the best-effort legacy
//! JSON mirror.

pub mod entities;
pub mod error;
pub mod mirror;
pub mod persister;
pub mod repos;
pub mod store;

pub use entities::{
    AiAnalysis, AnalysisDetails, KeyFindingRow, KeyFrameVideo, MetadataRow, Recording,
    TimestampEventRow,
};
pub use error::{DbError, DbResult};
pub use mirror::LegacyMirror;
pub use persister::ResultPersister;
pub use repos::{
    AnalysisRepository, KeyframeRepository, PromptTemplateRepository, RecordingRepository,
};
pub use store::SqliteStore;
