//! End-to-end pipeline tests against a mocked model provider and an
//! in-memory store.

use std::io::Write;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kfa_db::{KeyFrameVideo, Recording, ResultPersister, SqliteStore};
use kfa_gemini::{GeminiClient, GeminiConfig, GenerationConfig};
use kfa_models::AnalysisRequest;
use kfa_pipeline::{AnalysisPipeline, AnalysisWorker, PipelineError};
use kfa_prompt::PromptAssembler;

fn fake_video(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("session.mp4");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"fake video bytes").unwrap();
    path
}

fn report_json() -> serde_json::Value {
    serde_json::json!({
        "videoAnalysisMarkdown": "# Full analysis\n\nEverything observed.",
        "summaryMarkdown": "One long build, one quick fix.",
        "keyFindings": [{
            "category": "technical",
            "title": "Compile error",
            "content": "A type mismatch interrupts the flow.",
            "confidenceScore": "91.4",
            "relatedTimestamps": [12.0]
        }],
        "timestampEvents": [{
            "timestampSeconds": 12.0,
            "eventType": "highlight",
            "title": "Error appears",
            "importanceScore": 9
        }],
        "analysisMetadata": [{"key": "pace", "value": "steady"}]
    })
}

async fn mock_provider(server: &MockServer, response_text: &str) {
    let file = serde_json::json!({
        "name": "files/e2e",
        "uri": "https://example.com/files/e2e",
        "state": "ACTIVE"
    });
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"file": file})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/files/e2e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": response_text}]}}]
        })))
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> GeminiClient {
    let config = GeminiConfig {
        model: "gemini-test".to_string(),
        upload_max_attempts: 3,
        poll_interval: Duration::from_millis(5),
        activation_timeout: Duration::from_millis(500),
        generation: GenerationConfig::default(),
    };
    GeminiClient::new("test-key", config).with_base_url(server.uri())
}

async fn seeded_store() -> (SqliteStore, String) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let recording = Recording::new("/videos/session.mp4", "Session");
    store.recordings().create(&recording).await.unwrap();
    let keyframe = KeyFrameVideo::new(&recording.record_id, "/kf/session.mp4", 30);
    store.keyframes().create(&keyframe).await.unwrap();
    (store, recording.record_id)
}

#[tokio::test]
async fn test_full_run_persists_validated_report() {
    let server = MockServer::start().await;
    // The model wraps its JSON in a fence; recovery must unwrap it.
    let fenced = format!("```json\n{}\n```", report_json());
    mock_provider(&server, &fenced).await;

    let dir = tempfile::tempdir().unwrap();
    let video = fake_video(&dir);
    let (store, recording_id) = seeded_store().await;

    let pipeline = AnalysisPipeline::new(
        PromptAssembler::without_templates(),
        client_for(&server),
        ResultPersister::new(&store, "gemini-test"),
    );

    let request = AnalysisRequest::new(&recording_id, &video).with_category("coding");
    let outcome = pipeline.run(&request, &CancellationToken::new()).await.unwrap();

    // The string confidence score was coerced before validation.
    assert_eq!(outcome.report.key_findings[0].confidence_score, 91);

    let details = store
        .analyses()
        .latest_details_for_recording(&recording_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(details.analysis.analysis_id, outcome.analysis_id);
    assert_eq!(details.analysis.summary_md, "One long build, one quick fix.");
    assert_eq!(details.findings.len(), 1);
    assert_eq!(details.events.len(), 1);
    assert_eq!(details.metadata[0].value, "steady");
}

#[tokio::test]
async fn test_unrecoverable_response_leaves_store_untouched() {
    let server = MockServer::start().await;
    mock_provider(&server, "I could not analyze this video, sorry.").await;

    let dir = tempfile::tempdir().unwrap();
    let video = fake_video(&dir);
    let (store, recording_id) = seeded_store().await;

    let pipeline = AnalysisPipeline::new(
        PromptAssembler::without_templates(),
        client_for(&server),
        ResultPersister::new(&store, "gemini-test"),
    );

    let request = AnalysisRequest::new(&recording_id, &video);
    let err = pipeline
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoResult(_)));
    assert!(!err.is_retryable());

    let analyses = store.analyses().list_for_recording(&recording_id).await.unwrap();
    assert!(analyses.is_empty());
}

#[tokio::test]
async fn test_missing_file_fails_before_any_network_call() {
    let server = MockServer::start().await;
    // No mocks mounted: a request would fail loudly.

    let (store, recording_id) = seeded_store().await;
    let pipeline = AnalysisPipeline::new(
        PromptAssembler::without_templates(),
        client_for(&server),
        ResultPersister::new(&store, "gemini-test"),
    );

    let request = AnalysisRequest::new(&recording_id, "/nonexistent/clip.mp4");
    let err = pipeline
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Input(_)));
}

#[tokio::test]
async fn test_worker_loop_round_trip() {
    let server = MockServer::start().await;
    mock_provider(&server, &report_json().to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let video = fake_video(&dir);
    let (store, recording_id) = seeded_store().await;

    let pipeline = AnalysisPipeline::new(
        PromptAssembler::without_templates(),
        client_for(&server),
        ResultPersister::new(&store, "gemini-test"),
    );
    let (handle, join) = AnalysisWorker::spawn(pipeline, 4);

    let request = AnalysisRequest::new(&recording_id, &video).with_category("coding");
    let outcome = handle.analyze(request).await.unwrap();
    assert_eq!(outcome.report.timestamp_events.len(), 1);

    handle.shutdown();
    join.await.unwrap();
}

#[tokio::test]
async fn test_worker_unavailable_after_shutdown() {
    let server = MockServer::start().await;
    let (store, recording_id) = seeded_store().await;
    let pipeline = AnalysisPipeline::new(
        PromptAssembler::without_templates(),
        client_for(&server),
        ResultPersister::new(&store, "gemini-test"),
    );
    let (handle, join) = AnalysisWorker::spawn(pipeline, 4);

    handle.shutdown();
    join.await.unwrap();

    let request = AnalysisRequest::new(&recording_id, "/tmp/whatever.mp4");
    let err = handle.analyze(request).await.unwrap_err();
    assert!(matches!(err, PipelineError::WorkerUnavailable));
}
