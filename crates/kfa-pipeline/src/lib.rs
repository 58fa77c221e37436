//! Analysis pipeline orchestration.
//!
//! Wires the preflight, prompt, model, recovery, and persistence
//! stages into one invocation ([`AnalysisPipeline::run`]) and hosts
//! them behind a command-channel worker loop ([`AnalysisWorker`]).

pub mod config;
pub mod error;
pub mod pipeline;
pub mod worker;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{AnalysisPipeline, PipelineOutcome};
pub use worker::{AnalysisWorker, WorkerCommand, WorkerHandle};
