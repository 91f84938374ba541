//! Integration tests for the Ollama provider against a fake Ollama server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use learning_planner::config::OllamaConfig;
use learning_planner::error::LlmError;
use learning_planner::llm::{GenerateRequest, LlmProvider, OllamaProvider};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Default)]
struct FakeOllama {
    last_body: Arc<Mutex<Option<Value>>>,
}

async fn generate(State(fake): State<FakeOllama>, Json(body): Json<Value>) -> Json<Value> {
    *fake.last_body.lock().unwrap() = Some(body);
    Json(json!({
        "model": "llama3.2",
        "response": "{\"question_id\": \"x\"}",
        "done": true,
        "done_reason": "stop",
        "prompt_eval_count": 12,
        "eval_count": 34
    }))
}

async fn version() -> Json<Value> {
    Json(json!({ "version": "0.5.7" }))
}

async fn tags() -> Json<Value> {
    Json(json!({ "models": [{ "name": "llama3.2:latest" }, { "name": "mistral:7b" }] }))
}

async fn start_fake(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}

fn provider(base_url: String, model: &str) -> OllamaProvider {
    OllamaProvider::new(&OllamaConfig {
        base_url,
        model: model.to_string(),
        request_timeout: Duration::from_secs(2),
    })
    .unwrap()
}

#[tokio::test]
async fn generate_sends_json_format_and_options() {
    timeout(TEST_TIMEOUT, async {
        let fake = FakeOllama::default();
        let router = Router::new()
            .route("/api/generate", post(generate))
            .with_state(fake.clone());
        let base = start_fake(router).await;

        let response = provider(base, "llama3.2")
            .generate(
                GenerateRequest::new("Generate a question")
                    .with_system("JSON only")
                    .with_temperature(0.0)
                    .with_num_predict(4096),
            )
            .await
            .unwrap();

        assert_eq!(response.content, "{\"question_id\": \"x\"}");
        assert_eq!(response.input_tokens, 12);
        assert_eq!(response.output_tokens, 34);
        assert_eq!(response.done_reason.as_deref(), Some("stop"));

        let body = fake.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["prompt"], "Generate a question");
        assert_eq!(body["system"], "JSON only");
        assert_eq!(body["stream"], false);
        assert_eq!(body["format"], "json");
        assert_eq!(body["options"]["temperature"], 0.0);
        assert_eq!(body["options"]["num_predict"], 4096);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn health_check_reads_version_and_tags() {
    timeout(TEST_TIMEOUT, async {
        let router = Router::new()
            .route("/api/version", get(version))
            .route("/api/tags", get(tags));
        let base = start_fake(router).await;

        let health = provider(base.clone(), "llama3.2").health_check().await.unwrap();
        assert_eq!(health.provider, "ollama");
        assert_eq!(health.version.as_deref(), Some("0.5.7"));
        assert!(health.model_available);

        let health = provider(base, "qwen2.5").health_check().await.unwrap();
        assert!(!health.model_available);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn missing_model_maps_to_model_not_available() {
    timeout(TEST_TIMEOUT, async {
        let router = Router::new().route(
            "/api/generate",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": "model 'nope' not found" })),
                )
            }),
        );
        let base = start_fake(router).await;

        let err = provider(base, "nope")
            .generate(GenerateRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ModelNotAvailable { ref model, .. } if model == "nope"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn health_404_is_not_a_missing_model() {
    timeout(TEST_TIMEOUT, async {
        // Something answers HTTP here, but it is not Ollama.
        let base = start_fake(Router::new()).await;

        let err = provider(base, "llama3.2").health_check().await.unwrap_err();
        match err {
            LlmError::RequestFailed { reason, .. } => assert!(reason.contains("404")),
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn server_error_maps_to_request_failed() {
    timeout(TEST_TIMEOUT, async {
        let router = Router::new().route(
            "/api/generate",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "out of memory") }),
        );
        let base = start_fake(router).await;

        let err = provider(base, "llama3.2")
            .generate(GenerateRequest::new("hi"))
            .await
            .unwrap_err();
        match err {
            LlmError::RequestFailed { reason, .. } => {
                assert!(reason.contains("500"));
                assert!(reason.contains("out of memory"));
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn reply_without_response_field_is_invalid() {
    timeout(TEST_TIMEOUT, async {
        let router = Router::new().route(
            "/api/generate",
            post(|| async { Json(json!({ "done": true })) }),
        );
        let base = start_fake(router).await;

        let err = provider(base, "llama3.2")
            .generate(GenerateRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }), "got {err:?}");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    timeout(TEST_TIMEOUT, async {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = provider(format!("http://127.0.0.1:{port}"), "llama3.2")
            .generate(GenerateRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Unreachable { .. }), "got {err:?}");
    })
    .await
    .expect("test timed out");
}
