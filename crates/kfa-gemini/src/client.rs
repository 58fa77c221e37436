//! Gemini API client with upload/poll/retry discipline.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{GeminiError, GeminiResult};
use crate::types::{
    Content, FileData, FileInfo, FileState, GenerateRequest, GenerateResponse, Part,
    UploadResponse, WireGenerationConfig,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Caller-configurable generation parameters.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: None,
            max_output_tokens: None,
            response_mime_type: "application/json".to_string(),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Model name, e.g. "gemini-2.5-flash"
    pub model: String,
    /// Upload attempts before giving up
    pub upload_max_attempts: u32,
    /// Interval between file state polls
    pub poll_interval: Duration,
    /// Overall bound on waiting for the file to become active
    pub activation_timeout: Duration,
    /// Generation parameters
    pub generation: GenerationConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            upload_max_attempts: 3,
            poll_interval: Duration::from_secs(2),
            activation_timeout: Duration::from_secs(300),
            generation: GenerationConfig::default(),
        }
    }
}

/// Raw model output plus the provider-assigned asset handle.
///
/// The text is passed verbatim to recovery parsing; the handle is kept
/// for diagnosis only.
#[derive(Debug, Clone)]
pub struct RawModelResponse {
    pub text: String,
    pub file_name: String,
}

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    /// Create a client with explicit credentials and config.
    pub fn new(api_key: impl Into<String>, config: GeminiConfig) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            config,
            client: Client::new(),
        }
    }

    /// Create a client from `GEMINI_API_KEY` / `GEMINI_MODEL`.
    pub fn from_env() -> GeminiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| GeminiError::config_error("GEMINI_API_KEY not set"))?;
        let mut config = GeminiConfig::default();
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.model = model;
        }
        Ok(Self::new(api_key, config))
    }

    /// Override the API base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Model name used for generation.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Run the full upload → activate → generate sequence for one video.
    pub async fn analyze(
        &self,
        video_path: impl AsRef<Path>,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> GeminiResult<RawModelResponse> {
        let video_path = video_path.as_ref();
        info!("Starting video analysis for: {}", video_path.display());

        let file = self.upload_video(video_path).await?;
        info!("Video uploaded successfully: {}", file.name);

        let file = self.wait_for_active(file, cancel).await?;
        info!("File is now active");

        debug!("Sending prompt (first 200 chars): {}", truncate(prompt, 200));
        let mime_type = mime_for_path(video_path);
        let text = self.generate(&file, prompt, &mime_type).await?;
        info!(
            "Received model response ({} chars): {}",
            text.len(),
            truncate(&text, 500)
        );

        Ok(RawModelResponse {
            text,
            file_name: file.name,
        })
    }

    /// Upload the video with exponential backoff.
    async fn upload_video(&self, path: &Path) -> GeminiResult<FileInfo> {
        let bytes = tokio::fs::read(path).await?;
        let size_mb = bytes.len() as f64 / (1024.0 * 1024.0);
        info!("Preparing to upload video: {} ({:.2} MB)", path.display(), size_mb);

        let mime_type = mime_for_path(path);
        let mut last_error: Option<GeminiError> = None;

        for attempt in 0..self.config.upload_max_attempts {
            match self.try_upload(bytes.clone(), &mime_type).await {
                Ok(file) => return Ok(file),
                Err(e) => {
                    warn!(
                        "Upload attempt {}/{} failed: {}",
                        attempt + 1,
                        self.config.upload_max_attempts,
                        e
                    );
                    last_error = Some(e);
                    if attempt + 1 < self.config.upload_max_attempts {
                        let delay = Duration::from_secs(1 << attempt);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(GeminiError::UploadFailed {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
            attempts: self.config.upload_max_attempts,
        })
    }

    async fn try_upload(&self, bytes: Vec<u8>, mime_type: &str) -> GeminiResult<FileInfo> {
        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);

        let response = self
            .client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeminiError::generation_failed(format!(
                "Upload returned {}: {}",
                status, error_text
            )));
        }

        let upload: UploadResponse = response.json().await?;
        Ok(upload.file)
    }

    /// Wait until the file is ACTIVE, polling its state.
    ///
    /// Returns without a round-trip when the upload response already
    /// reports the file active.
    async fn wait_for_active(
        &self,
        file: FileInfo,
        cancel: &CancellationToken,
    ) -> GeminiResult<FileInfo> {
        let start = tokio::time::Instant::now();
        let mut info = file;

        loop {
            match info.state {
                FileState::Active => return Ok(info),
                FileState::Failed => return Err(GeminiError::ActivationFailed(info.name)),
                FileState::Processing | FileState::Unknown => {}
            }

            if cancel.is_cancelled() {
                return Err(GeminiError::Cancelled);
            }
            if start.elapsed() >= self.config.activation_timeout {
                return Err(GeminiError::ActivationTimeout(
                    self.config.activation_timeout.as_secs(),
                ));
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(GeminiError::Cancelled),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            info = self.get_file(&info.name).await?;
        }
    }

    async fn get_file(&self, file_name: &str) -> GeminiResult<FileInfo> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, file_name, self.api_key);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeminiError::generation_failed(format!(
                "File lookup returned {}: {}",
                status, error_text
            )));
        }

        Ok(response.json().await?)
    }

    /// Invoke content generation with the uploaded asset and prompt.
    async fn generate(
        &self,
        file: &FileInfo,
        prompt: &str,
        mime_type: &str,
    ) -> GeminiResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.config.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::File {
                        file_data: FileData {
                            file_uri: file.uri.clone(),
                            mime_type: mime_type.to_string(),
                        },
                    },
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: WireGenerationConfig {
                response_mime_type: self.config.generation.response_mime_type.clone(),
                temperature: self.config.generation.temperature,
                max_output_tokens: self.config.generation.max_output_tokens,
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeminiError::generation_failed(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let generated: GenerateResponse = response.json().await?;

        generated
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .filter(|t| !t.is_empty())
            .ok_or(GeminiError::EmptyResponse)
    }
}

/// MIME type from the file extension; upload preflight already limited
/// the extension set.
fn mime_for_path(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "mp4" => "video/mp4",
        "mpeg" | "mpg" => "video/mpeg",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        "wmv" => "video/x-ms-wmv",
        "3gpp" => "video/3gpp",
        "mkv" => "video/x-matroska",
        _ => "video/mp4",
    };
    mime.to_string()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
