//! The four-stage analysis pipeline.

use std::time::Instant;

use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use kfa_db::ResultPersister;
use kfa_gemini::GeminiClient;
use kfa_media::{probe_context, validate_video};
use kfa_models::{AnalysisReport, AnalysisRequest};
use kfa_prompt::PromptAssembler;

use crate::error::PipelineResult;

/// Result of one successful pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Id of the persisted analysis row
    pub analysis_id: String,
    /// The validated report that was stored
    pub report: AnalysisReport,
    /// End-to-end wall time in milliseconds
    pub elapsed_ms: u64,
}

/// Prompt → model → recovery → persistence, one invocation at a time.
///
/// Stages share no mutable state; concurrent runs for different
/// recordings are independent. Serializing runs for the same recording
/// is the caller's job.
pub struct AnalysisPipeline {
    assembler: PromptAssembler,
    client: GeminiClient,
    persister: ResultPersister,
}

impl AnalysisPipeline {
    pub fn new(
        assembler: PromptAssembler,
        client: GeminiClient,
        persister: ResultPersister,
    ) -> Self {
        Self {
            assembler,
            client,
            persister,
        }
    }

    /// Run the full pipeline for one request.
    pub async fn run(
        &self,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
    ) -> PipelineResult<PipelineOutcome> {
        let started = Instant::now();
        info!(
            "Analyzing recording {} ({})",
            request.recording_id,
            request.video_path.display()
        );

        validate_video(&request.video_path)?;

        // Probe only when the caller did not supply context; a probe
        // failure costs the context layer of the prompt, nothing more.
        let context = match &request.context {
            Some(ctx) => Some(ctx.clone()),
            None => match probe_context(&request.video_path).await {
                Ok(ctx) => Some(ctx),
                Err(e) => {
                    warn!("Video probe failed, continuing without context: {e}");
                    None
                }
            },
        };

        let prompt = self
            .assembler
            .build(&request.category, context.as_ref(), &request.variables)
            .await;

        let raw = self
            .client
            .analyze(&request.video_path, &prompt, cancel)
            .await?;

        let report = kfa_recovery::parse(&raw.text)?;

        let analysis_id = self.persister.save(&request.recording_id, &report).await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        counter!("kfa_pipeline_completed_total").increment(1);
        info!(
            "Analysis {analysis_id} completed for recording {} in {elapsed_ms} ms",
            request.recording_id
        );

        Ok(PipelineOutcome {
            analysis_id,
            report,
            elapsed_ms,
        })
    }
}
