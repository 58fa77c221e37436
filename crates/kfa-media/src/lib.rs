//! Video preflight validation and metadata probing.
//!
//! This crate provides:
//! - Input checks (existence, supported container, size cap) before any
//!   network call is made
//! - An FFprobe wrapper that fills a [`kfa_models::VideoContext`]

pub mod error;
pub mod probe;
pub mod validate;

pub use error::{MediaError, MediaResult};
pub use probe::{probe_context, probe_video, VideoInfo};
pub use validate::{validate_video, MAX_FILE_SIZE_BYTES, SUPPORTED_EXTENSIONS};
