//! Keyframe analysis worker binary.
//!
//! Resident mode hosts the analysis worker loop until ctrl-c. With
//! `kfa-worker <recording-id> <video-path> [category]` it runs one
//! analysis and exits.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kfa_db::{LegacyMirror, ResultPersister, SqliteStore};
use kfa_gemini::GeminiClient;
use kfa_models::AnalysisRequest;
use kfa_pipeline::{AnalysisPipeline, AnalysisWorker, PipelineConfig};
use kfa_prompt::PromptAssembler;

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("kfa=info".parse().expect("valid directive"))
        .add_directive("sqlx=warn".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting kfa-worker");

    let config = PipelineConfig::from_env();
    info!("Pipeline config: {:?}", config);

    let api_key = match std::env::var("GEMINI_API_KEY") {
        Ok(key) => key,
        Err(_) => {
            error!("GEMINI_API_KEY is not set");
            std::process::exit(1);
        }
    };

    let store = match SqliteStore::open(&config.database_path).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let client = GeminiClient::new(api_key, config.gemini_config());
    let assembler = PromptAssembler::new(Arc::new(store.templates()));
    let mut persister = ResultPersister::new(&store, &config.model);
    if let Some(path) = &config.mirror_path {
        persister = persister.with_mirror(LegacyMirror::new(path));
    }

    let pipeline = AnalysisPipeline::new(assembler, client, persister);
    let (handle, join) = AnalysisWorker::spawn(pipeline, config.queue_capacity);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut failed = false;
    if args.len() >= 2 {
        let mut request = AnalysisRequest::new(&args[0], &args[1]);
        if let Some(category) = args.get(2) {
            request = request.with_category(category);
        }
        match handle.analyze(request).await {
            Ok(outcome) => info!(
                "Analysis {} stored in {} ms",
                outcome.analysis_id, outcome.elapsed_ms
            ),
            Err(e) => {
                error!("Analysis failed: {e}");
                failed = true;
            }
        }
        handle.shutdown();
    } else {
        info!("Running as resident worker");
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        handle.shutdown();
    }

    join.await.ok();
    info!("Worker shutdown complete");
    if failed {
        std::process::exit(1);
    }
}
