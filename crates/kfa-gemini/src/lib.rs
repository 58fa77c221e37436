//! Gemini Files API client.
//!
//! This crate owns the remote half of the analysis pipeline: uploading
//! the keyframe video, waiting for the asset to become active, and
//! invoking content generation. It returns raw response text and never
//! interprets JSON; recovery parsing lives in kfa-recovery.

pub mod client;
pub mod error;
mod types;

pub use client::{GeminiClient, GeminiConfig, GenerationConfig, RawModelResponse};
pub use error::{GeminiError, GeminiResult};
