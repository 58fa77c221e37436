//! Shared data models for the keyframe analysis backend.
//!
//! This crate provides Serde-serializable types for:
//! - The structured report contract the model must honor
//! - Analysis requests and probed video context
//! - Analysis lifecycle status

pub mod report;
pub mod request;
pub mod status;

// Re-export common types
pub use report::{AnalysisReport, EventType, FindingCategory, KeyFinding, MetadataEntry, TimestampEvent};
pub use request::{AnalysisRequest, VideoContext};
pub use status::AnalysisStatus;
