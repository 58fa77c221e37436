//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use kfa_gemini::{GeminiConfig, GenerationConfig};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model name used for generation
    pub model: String,
    /// SQLite database path
    pub database_path: PathBuf,
    /// Legacy JSON history file; `None` disables mirroring
    pub mirror_path: Option<PathBuf>,
    /// Upload attempts before giving up
    pub upload_max_attempts: u32,
    /// Interval between file activation polls
    pub poll_interval: Duration,
    /// Overall bound on waiting for upload activation
    pub activation_timeout: Duration,
    /// Sampling temperature, if overridden
    pub temperature: Option<f32>,
    /// Pending analysis commands the worker queue holds
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            database_path: PathBuf::from("keyframe_analysis.db"),
            mirror_path: Some(PathBuf::from("analyses.json")),
            upload_max_attempts: 3,
            poll_interval: Duration::from_secs(2),
            activation_timeout: Duration::from_secs(300),
            temperature: None,
            queue_capacity: 16,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            database_path: std::env::var("KFA_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            mirror_path: match std::env::var("KFA_MIRROR_PATH") {
                Ok(v) if v.is_empty() => None,
                Ok(v) => Some(PathBuf::from(v)),
                Err(_) => defaults.mirror_path,
            },
            upload_max_attempts: std::env::var("KFA_UPLOAD_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.upload_max_attempts),
            poll_interval: Duration::from_secs(
                std::env::var("KFA_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.poll_interval.as_secs()),
            ),
            activation_timeout: Duration::from_secs(
                std::env::var("KFA_ACTIVATION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.activation_timeout.as_secs()),
            ),
            temperature: std::env::var("KFA_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok()),
            queue_capacity: std::env::var("KFA_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.queue_capacity),
        }
    }

    /// Derive the model client configuration.
    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            model: self.model.clone(),
            upload_max_attempts: self.upload_max_attempts,
            poll_interval: self.poll_interval,
            activation_timeout: self.activation_timeout,
            generation: GenerationConfig {
                temperature: self.temperature,
                ..GenerationConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_policy() {
        let config = PipelineConfig::default();
        assert_eq!(config.upload_max_attempts, 3);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.activation_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_gemini_config_carries_model_and_timing() {
        let mut config = PipelineConfig::default();
        config.model = "gemini-test".to_string();
        config.temperature = Some(0.2);

        let gemini = config.gemini_config();
        assert_eq!(gemini.model, "gemini-test");
        assert_eq!(gemini.generation.temperature, Some(0.2));
        assert_eq!(gemini.generation.response_mime_type, "application/json");
    }
}
