//! Router tests against stub backends.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use text2sql::config::RoutesConfig;
use text2sql::llm::Completion;
use text2sql::{
    router, AppState, BackendKind, InferenceAdapter, InferenceBackend, Prompt, Result,
    Text2SqlError,
};
use tower::ServiceExt;

/// Backend that records prompts and replies with a fixed result.
struct StubBackend {
    kind: BackendKind,
    reply: std::result::Result<String, String>,
    delay: Duration,
    prompts: Mutex<Vec<Prompt>>,
}

impl StubBackend {
    fn replying(kind: BackendKind, sql: &str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            reply: Ok(sql.to_string()),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(kind: BackendKind, message: &str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            reply: Err(message.to_string()),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn last_prompt(&self) -> Prompt {
        self.prompts.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl InferenceBackend for StubBackend {
    async fn generate(&self, prompt: &Prompt, _max_output_tokens: usize) -> Result<Completion> {
        self.prompts.lock().unwrap().push(prompt.clone());
        tokio::time::sleep(self.delay).await;
        match &self.reply {
            Ok(sql) => Ok(Completion {
                text: sql.clone(),
                score: Some(-0.5),
            }),
            Err(msg) => Err(Text2SqlError::inference(self.kind.as_str(), msg.clone())),
        }
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn model_name(&self) -> &str {
        "stub"
    }

    fn default_max_output_tokens(&self) -> usize {
        64
    }
}

fn app_with_timeout(timeout: Duration, backends: Vec<Arc<StubBackend>>) -> Router {
    let backends = backends
        .into_iter()
        .map(|b| b as Arc<dyn InferenceBackend>)
        .collect();
    router(AppState::new(
        InferenceAdapter::new(timeout),
        backends,
        RoutesConfig::default(),
    ))
}

fn app(backends: Vec<Arc<StubBackend>>) -> Router {
    app_with_timeout(Duration::from_secs(5), backends)
}

fn local_app(sql: &str) -> Router {
    app(vec![StubBackend::replying(BackendKind::Local, sql)])
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_needs_no_backend() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(Vec::new()), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_simple_returns_sql() {
    let backend = StubBackend::replying(BackendKind::Local, "SELECT * FROM users WHERE age > 25");
    let app = app(vec![backend.clone()]);

    let (status, body) = send(
        app,
        post("/text-to-sql/simple", r#"{"query": "Find all users that are elder than 25"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sql_query"], "SELECT * FROM users WHERE age > 25");
    assert_eq!(
        backend.last_prompt().text,
        "Translate English to SQL: Find all users that are elder than 25"
    );
}

#[tokio::test]
async fn test_simple_rejects_empty_query() {
    for body in [r#"{"query": ""}"#, r#"{"query": "   "}"#, "{}"] {
        let (status, body) = send(local_app("SELECT 1"), post("/text-to-sql/simple", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Query cannot be empty"));
    }
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (status, body) = send(local_app("SELECT 1"), post("/text-to-sql/simple", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(local_app("SELECT 1"), post("/text-to-sql/simple", r#"{"query": 42}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_complex_embeds_schema() {
    let backend = StubBackend::replying(BackendKind::Local, "SELECT COUNT(*) FROM orders");
    let app = app(vec![backend.clone()]);
    let body = json!({
        "query": "how many orders",
        "schema": {"tables": [{"name": "orders", "columns": [{"name": "id", "type": "INTEGER"}]}]}
    });

    let (status, body) = send(app, post("/text-to-sql/complex", &body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sql_query"], "SELECT COUNT(*) FROM orders");
    let prompt = backend.last_prompt().text;
    assert!(prompt.starts_with("Schema: Table orders has columns id."));
    assert!(prompt.ends_with("Translate English to SQL: how many orders"));
}

#[tokio::test]
async fn test_complex_requires_schema_and_query() {
    for body in [
        json!({"query": "how many orders"}),
        json!({"query": "how many orders", "schema": null}),
        json!({"query": "", "schema": {"tables": []}}),
    ] {
        let (status, body) =
            send(local_app("SELECT 1"), post("/text-to-sql/complex", &body.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Schema and query cannot be empty");
    }
}

#[tokio::test]
async fn test_gpt_uses_remote_backend_without_schema() {
    let remote = StubBackend::replying(BackendKind::Remote, "SELECT name FROM users");
    let app = app(vec![remote.clone()]);

    let (status, body) = send(app, post("/text-to-sql/gpt", r#"{"query": "user names"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sql_query"], "SELECT name FROM users");
    let prompt = remote.last_prompt();
    assert_eq!(prompt.text, "Convert this natural language query to SQL: user names");
    assert!(prompt.system.starts_with("You are a SQL expert."));
}

#[tokio::test]
async fn test_gpt_and_groq_serve_side_by_side() {
    let openai = StubBackend::replying(BackendKind::Remote, "SELECT 1");
    let groq = StubBackend::replying(BackendKind::Groq, "SELECT 2");
    let app = app(vec![openai.clone(), groq.clone()]);
    let body = json!({
        "query": "count orders",
        "schema": {"tables": [{"name": "orders", "columns": [{"name": "id", "type": "INTEGER"}]}]}
    })
    .to_string();

    let (status, gpt) = send(app.clone(), post("/text-to-sql/gpt", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gpt["sql_query"], "SELECT 1");

    let (status, groq_body) = send(app, post("/text-to-sql/groq", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(groq_body["sql_query"], "SELECT 2");

    let prompt = groq.last_prompt();
    assert!(prompt.text.contains("Table orders: id (INTEGER)"));
    assert!(prompt.system.ends_with("based on the provided schema."));
    assert_eq!(openai.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_convert_reports_confidence_and_time() {
    let backend = StubBackend::replying(BackendKind::Local, "SELECT \"a\" FROM t");
    let app = app(vec![backend.clone()]);

    let (status, body) = send(app, post("/convert", r#"{"text": "all a from t"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sql_query"], "SELECT 'a' FROM t");
    assert_eq!(body["confidence"], -0.5);
    assert!(body["execution_time"].as_f64().unwrap() >= 0.0);
    assert_eq!(backend.last_prompt().text, "### Question: all a from t\n### SQL Query:");
}

#[tokio::test]
async fn test_inference_failure_is_generic_500() {
    let app = app(vec![StubBackend::failing(BackendKind::Local, "CUDA out of memory")]);

    let (status, body) = send(app, post("/text-to-sql/simple", r#"{"query": "list users"}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to generate SQL query");
}

#[tokio::test]
async fn test_slow_backend_is_gateway_timeout() {
    let slow = Arc::new(StubBackend {
        kind: BackendKind::Local,
        reply: Ok("SELECT 1".to_string()),
        delay: Duration::from_secs(5),
        prompts: Mutex::new(Vec::new()),
    });
    let app = app_with_timeout(Duration::from_millis(50), vec![slow]);

    let (status, body) = send(app, post("/text-to-sql/simple", r#"{"query": "list users"}"#)).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_routes_without_backend_are_not_mounted() {
    let (status, _) = send(local_app("SELECT 1"), post("/text-to-sql/gpt", r#"{"query": "x"}"#)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let remote_only = app(vec![StubBackend::replying(BackendKind::Remote, "SELECT 1")]);
    let (status, _) = send(remote_only.clone(), post("/text-to-sql/simple", r#"{"query": "x"}"#)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(remote_only, post("/text-to-sql/groq", r#"{"query": "x"}"#)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
