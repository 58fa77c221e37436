//! The analysis worker loop.
//!
//! Callers never touch the pipeline directly; they send commands over a
//! bounded channel and await the reply. This keeps ordering and
//! cancellation explicit where the original design relied on registered
//! callbacks.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use kfa_models::AnalysisRequest;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{AnalysisPipeline, PipelineOutcome};

/// Commands accepted by the worker loop.
pub enum WorkerCommand {
    Analyze {
        request: AnalysisRequest,
        reply: oneshot::Sender<PipelineResult<PipelineOutcome>>,
    },
}

/// Caller-side handle to a running worker.
#[derive(Clone)]
pub struct WorkerHandle {
    sender: mpsc::Sender<WorkerCommand>,
    cancel: CancellationToken,
}

impl WorkerHandle {
    /// Submit a request and wait for its outcome.
    pub async fn analyze(&self, request: AnalysisRequest) -> PipelineResult<PipelineOutcome> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(WorkerCommand::Analyze { request, reply })
            .await
            .map_err(|_| PipelineError::WorkerUnavailable)?;
        receiver.await.map_err(|_| PipelineError::WorkerUnavailable)?
    }

    /// Cancel the in-flight run (if any) and stop the loop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Long-running loop that owns the pipeline.
pub struct AnalysisWorker {
    pipeline: Arc<AnalysisPipeline>,
    receiver: mpsc::Receiver<WorkerCommand>,
    cancel: CancellationToken,
}

impl AnalysisWorker {
    /// Spawn the worker task; returns the caller handle and the join
    /// handle for shutdown sequencing.
    pub fn spawn(
        pipeline: AnalysisPipeline,
        queue_capacity: usize,
    ) -> (WorkerHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        let cancel = CancellationToken::new();
        let worker = Self {
            pipeline: Arc::new(pipeline),
            receiver,
            cancel: cancel.clone(),
        };
        let join = tokio::spawn(worker.run());
        (WorkerHandle { sender, cancel }, join)
    }

    async fn run(mut self) {
        info!("Analysis worker started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                command = self.receiver.recv() => {
                    match command {
                        Some(command) => self.handle(command).await,
                        None => break,
                    }
                }
            }
        }
        info!("Analysis worker stopped");
    }

    async fn handle(&self, command: WorkerCommand) {
        match command {
            WorkerCommand::Analyze { request, reply } => {
                let result = self.pipeline.run(&request, &self.cancel).await;
                if let Err(e) = &result {
                    counter!("kfa_pipeline_failed_total", "stage" => e.stage()).increment(1);
                    error!(
                        "Analysis failed for recording {} at {} stage: {e}",
                        request.recording_id,
                        e.stage()
                    );
                }
                // A caller that gave up waiting is not an error.
                let _ = reply.send(result);
            }
        }
    }
}
