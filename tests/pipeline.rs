//! End-to-end pipeline tests against a mock Ollama server.
//!
//! The mock serves `/api/embed` with bag-of-words vectors and
//! `/api/generate` with either a single JSON object or an NDJSON stream,
//! depending on the request's `stream` flag.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

use ragpipe::models::ChatMessage;
use ragpipe::{PipeOutput, Pipeline, PipelineError, Valves};

const VOCAB: &[&str] = &["paris", "france", "rust", "docker"];

/// How `/api/generate` responds.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
enum Generate {
    #[default]
    Answer,
    Fail,
    /// Accept the request and never send headers.
    Hang,
    /// Send one streamed fragment, then go silent.
    StallMidStream,
}

#[derive(Default)]
struct Mock {
    generate: Generate,
    embed_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

fn embed_text(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = VOCAB.iter().map(|w| lower.matches(w).count() as f32).collect();
    v.push(0.1);
    v
}

async fn embed(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> Json<Value> {
    mock.embed_calls.fetch_add(1, Ordering::SeqCst);
    let vectors: Vec<Vec<f32>> = body["input"]
        .as_array()
        .map(|items| items.iter().map(|t| embed_text(t.as_str().unwrap_or(""))).collect())
        .unwrap_or_default();
    Json(json!({ "model": body["model"], "embeddings": vectors }))
}

async fn generate(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> Response {
    mock.generate_calls.fetch_add(1, Ordering::SeqCst);
    mock.prompts
        .lock()
        .unwrap()
        .push(body["prompt"].as_str().unwrap_or_default().to_string());

    match mock.generate {
        Generate::Fail => return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        Generate::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return StatusCode::GATEWAY_TIMEOUT.into_response();
        }
        Generate::StallMidStream => {
            let first = futures_util::stream::iter(vec![Ok::<_, std::convert::Infallible>(
                "{\"response\":\"A\",\"done\":false}\n".to_string(),
            )]);
            let stream = first.chain(futures_util::stream::pending());
            return Body::from_stream(stream).into_response();
        }
        Generate::Answer => {}
    }

    if body["stream"].as_bool().unwrap_or(true) {
        let lines = vec![
            "{\"response\":\"A\",\"done\":false}\n".to_string(),
            "{\"response\":\"B\",\"done\":false}\n".to_string(),
            "{\"response\":\"C\",\"done\":false}\n".to_string(),
            "{\"response\":\"\",\"done\":true}\n".to_string(),
        ];
        let stream =
            futures_util::stream::iter(lines.into_iter().map(Ok::<_, std::convert::Infallible>));
        (
            [(header::CONTENT_TYPE, "application/x-ndjson")],
            Body::from_stream(stream),
        )
            .into_response()
    } else {
        Json(json!({ "model": body["model"], "response": "Paris", "done": true })).into_response()
    }
}

async fn spawn_mock(mock: Arc<Mock>) -> String {
    let app = Router::new()
        .route("/api/embed", post(embed))
        .route("/api/generate", post(generate))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn write_corpus() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("b.txt"), "Paris is the capital of France.").unwrap();
    fs::write(tmp.path().join("a.md"), "# Rust\n\nRust is a systems language.").unwrap();
    fs::create_dir(tmp.path().join("sub")).unwrap();
    fs::write(tmp.path().join("sub").join("c.txt"), "Docker runs containers.").unwrap();
    fs::write(tmp.path().join("skip.bin"), [0u8, 1, 2]).unwrap();
    tmp
}

async fn started(generate: Generate) -> (TempDir, Arc<Mock>, Pipeline) {
    started_with_timeout(generate, Valves::default().timeout_secs).await
}

async fn started_with_timeout(
    generate: Generate,
    timeout_secs: u64,
) -> (TempDir, Arc<Mock>, Pipeline) {
    let tmp = write_corpus();
    let mock = Arc::new(Mock {
        generate,
        ..Mock::default()
    });
    let base_url = spawn_mock(mock.clone()).await;

    let valves = Valves {
        document_path: tmp.path().to_path_buf(),
        base_url,
        timeout_secs,
        ..Valves::default()
    };
    let mut pipeline = Pipeline::new(valves).unwrap();
    pipeline.on_startup().await.unwrap();
    (tmp, mock, pipeline)
}

fn blocking() -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("stream".into(), Value::Bool(false));
    body
}

#[tokio::test]
async fn test_startup_indexes_documents_in_path_order() {
    let (_tmp, mock, pipeline) = started(Generate::Answer).await;
    assert!(pipeline.is_ready());

    let ids: Vec<&str> = pipeline.documents().iter().map(|d| d.source_id.as_str()).collect();
    assert_eq!(ids, ["a.md", "b.txt", "sub/c.txt"]);
    // one chunk per short document, all in one embedding batch
    assert_eq!(pipeline.indexed_chunks(), 3);
    assert_eq!(mock.embed_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_blocking_answer() {
    let (_tmp, mock, pipeline) = started(Generate::Answer).await;

    let history = vec![ChatMessage::new("user", "What is the capital of France?")];
    let out = pipeline
        .pipe("What is the capital of France?", "llama3", &history, &blocking())
        .await
        .unwrap();
    match out {
        PipeOutput::Text(text) => assert_eq!(text, "Paris"),
        other => panic!("expected text, got {:?}", other),
    }

    let prompts = mock.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.starts_with("Context: Paris is the capital of France."));
    assert!(prompt.ends_with("\n\nQuestion: What is the capital of France?\nAnswer:"));
}

#[tokio::test]
async fn test_streaming_answer_is_default() {
    let (_tmp, _mock, pipeline) = started(Generate::Answer).await;

    let out = pipeline.pipe("Say ABC", "llama3", &[], &Map::new()).await.unwrap();
    let PipeOutput::Stream(tokens) = out else {
        panic!("expected a stream");
    };
    assert_eq!(tokens.collect_text().await, "ABC");
}

#[tokio::test]
async fn test_stream_can_be_dropped_early() {
    let (_tmp, _mock, pipeline) = started(Generate::Answer).await;

    let out = pipeline.pipe("Say ABC", "llama3", &[], &Map::new()).await.unwrap();
    let PipeOutput::Stream(mut tokens) = out else {
        panic!("expected a stream");
    };
    assert_eq!(tokens.next().await.as_deref(), Some("A"));
    drop(tokens);

    // The pipeline keeps serving after an abandoned stream.
    let again = pipeline.pipe("Say ABC", "llama3", &[], &blocking()).await.unwrap();
    assert_eq!(again.into_text().await, "Paris");
}

#[tokio::test]
async fn test_endpoint_error_becomes_text() {
    let (_tmp, _mock, pipeline) = started(Generate::Fail).await;

    let out = pipeline.pipe("What?", "llama3", &[], &blocking()).await.unwrap();
    let text = out.into_text().await;
    assert!(text.starts_with("Error: "), "{}", text);
    assert!(text.contains("500"), "{}", text);

    // Streaming requests fail on status before any fragment.
    let out = pipeline.pipe("What?", "llama3", &[], &Map::new()).await.unwrap();
    assert!(matches!(out, PipeOutput::Text(ref t) if t.contains("500")));
}

#[tokio::test]
async fn test_empty_message_makes_no_calls() {
    let (_tmp, mock, pipeline) = started(Generate::Answer).await;
    let embeds_after_startup = mock.embed_calls.load(Ordering::SeqCst);

    let err = pipeline.pipe("   ", "llama3", &[], &Map::new()).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidQuery(_)));
    assert_eq!(mock.embed_calls.load(Ordering::SeqCst), embeds_after_startup);
    assert_eq!(mock.generate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_server_fails_startup() {
    let tmp = write_corpus();
    let valves = Valves {
        document_path: tmp.path().to_path_buf(),
        base_url: "http://127.0.0.1:1".into(),
        ..Valves::default()
    };
    let mut pipeline = Pipeline::new(valves).unwrap();
    let err = pipeline.on_startup().await.unwrap_err();
    assert!(matches!(err, PipelineError::IndexBuild(_)));
    assert!(!pipeline.is_ready());
}

#[tokio::test]
async fn test_missing_document_path_fails_startup() {
    let tmp = TempDir::new().unwrap();
    let valves = Valves {
        document_path: tmp.path().join("absent"),
        ..Valves::default()
    };
    let mut pipeline = Pipeline::new(valves).unwrap();
    let err = pipeline.on_startup().await.unwrap_err();
    assert!(matches!(err, PipelineError::DocumentSourceNotFound(_)));
}

#[tokio::test]
async fn test_hung_endpoint_times_out_in_both_modes() {
    let (_tmp, _mock, pipeline) = started_with_timeout(Generate::Hang, 1).await;

    let out = tokio::time::timeout(
        Duration::from_secs(10),
        pipeline.pipe("What?", "llama3", &[], &blocking()),
    )
    .await
    .expect("blocking pipe did not return")
    .unwrap();
    let text = out.into_text().await;
    assert!(text.starts_with("Error: model endpoint timed out"), "{}", text);

    let out = tokio::time::timeout(
        Duration::from_secs(10),
        pipeline.pipe("What?", "llama3", &[], &Map::new()),
    )
    .await
    .expect("streaming pipe did not return")
    .unwrap();
    assert!(
        matches!(out, PipeOutput::Text(ref t) if t.starts_with("Error: model endpoint timed out")),
        "{:?}",
        out
    );
}

#[tokio::test]
async fn test_stalled_stream_ends_with_partial_output() {
    let (_tmp, _mock, pipeline) = started_with_timeout(Generate::StallMidStream, 1).await;

    let out = pipeline.pipe("Say A", "llama3", &[], &Map::new()).await.unwrap();
    let PipeOutput::Stream(tokens) = out else {
        panic!("expected a stream");
    };
    let text = tokio::time::timeout(Duration::from_secs(10), tokens.collect_text())
        .await
        .expect("stalled stream never ended");
    assert_eq!(text, "A");
}
