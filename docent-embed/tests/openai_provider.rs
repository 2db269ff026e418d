//! Tests for the live provider against an in-process axum stub.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use docent_embed::{EmbedConfig, EmbedError, EmbeddingProvider, OpenAiProvider};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// What the stub answers for one request.
struct Reply {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

impl Reply {
    fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: None,
        }
    }
}

/// One request seen by the stub.
#[derive(Debug, Clone)]
struct Recorded {
    authorization: Option<String>,
    body: Value,
}

type Handler = dyn Fn(&Value) -> Reply + Send + Sync;

#[derive(Clone)]
struct StubState {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

/// An embeddings endpoint served by axum on an ephemeral local port.
struct Stub {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Stub {
    async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            handler: Arc::new(handler),
            requests: requests.clone(),
        };
        let app = Router::new()
            .route("/v1/embeddings", post(embeddings))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    fn config(&self) -> EmbedConfig {
        EmbedConfig::live("sk-test").with_api_base(format!("http://{}/v1", self.addr))
    }

    fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn bodies(&self) -> Vec<Value> {
        self.recorded().into_iter().map(|r| r.body).collect()
    }
}

async fn embeddings(State(state): State<StubState>, headers: HeaderMap, body: Bytes) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let reply = (state.handler)(&body);
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .requests
        .lock()
        .unwrap()
        .push(Recorded { authorization, body });

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap();
    (status, [(header::CONTENT_TYPE, "application/json")], reply.body).into_response()
}

fn inputs(body: &Value) -> Vec<String> {
    body["input"]
        .as_array()
        .map(|a| {
            a.iter()
                .map(|v| v.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// One `[len, 1, 0]` vector per input, each carrying its index.
fn echo_lengths(body: &Value) -> Reply {
    let data: Vec<Value> = inputs(body)
        .iter()
        .enumerate()
        .map(|(i, text)| json!({"object": "embedding", "index": i, "embedding": [text.len() as f32, 1.0, 0.0]}))
        .collect();
    Reply::ok(json!({"object": "list", "data": data, "model": body["model"]}))
}

fn texts(n: usize) -> Vec<String> {
    (0..n).map(|i| "x".repeat(i + 1)).collect()
}

#[tokio::test]
async fn test_batches_never_exceed_64() {
    let stub = Stub::start(echo_lengths).await;
    let provider = OpenAiProvider::new(stub.config()).unwrap();

    let input = texts(130);
    let result = provider.embed_texts(&input).await.unwrap();

    assert_eq!(result.len(), 130);
    assert_eq!(result.dimension, 3);
    assert_eq!(provider.embedding_dimension(), Some(3));
    // Order is preserved across batches
    for (i, embedding) in result.embeddings.iter().enumerate() {
        assert_eq!(embedding[0], (i + 1) as f32);
    }

    let sizes: Vec<usize> = stub.bodies().iter().map(|b| inputs(b).len()).collect();
    assert_eq!(sizes, vec![64, 64, 2]);
    assert!(stub.bodies().iter().all(|b| b["model"] == "deepseek-text"));
}

#[tokio::test]
async fn test_configured_batch_size_and_auth_header() {
    let stub = Stub::start(echo_lengths).await;
    let provider = OpenAiProvider::new(stub.config().with_batch_size(10)).unwrap();

    provider.embed_texts(&texts(25)).await.unwrap();

    let sizes: Vec<usize> = stub.bodies().iter().map(|b| inputs(b).len()).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
    for request in stub.recorded() {
        assert_eq!(request.authorization.as_deref(), Some("Bearer sk-test"));
    }
}

#[tokio::test]
async fn test_rows_reordered_by_index() {
    let stub = Stub::start(|body: &Value| {
        let mut data: Vec<Value> = inputs(body)
            .iter()
            .enumerate()
            .map(|(i, _)| json!({"index": i, "embedding": [i as f32, 1.0]}))
            .collect();
        data.reverse();
        Reply::ok(json!({"data": data}))
    })
    .await;
    let provider = OpenAiProvider::new(stub.config()).unwrap();

    let result = provider.embed_texts(&texts(3)).await.unwrap();
    let firsts: Vec<f32> = result.embeddings.iter().map(|e| e[0]).collect();
    assert_eq!(firsts, vec![0.0, 1.0, 2.0]);
}

#[tokio::test]
async fn test_count_mismatch() {
    let stub = Stub::start(|body: &Value| {
        let n = inputs(body).len().saturating_sub(1);
        let data: Vec<Value> = (0..n).map(|_| json!({"embedding": [0.5, 0.5]})).collect();
        Reply::ok(json!({"data": data}))
    })
    .await;
    let provider = OpenAiProvider::new(stub.config()).unwrap();

    let err = provider.embed_texts(&texts(3)).await.unwrap_err();
    assert!(matches!(
        err,
        EmbedError::CountMismatch {
            expected: 3,
            actual: 2
        }
    ));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let stub = Stub::start(|_: &Value| Reply {
        status: 401,
        body: r#"{"error":{"message":"invalid api key"}}"#.to_string(),
        delay: None,
    })
    .await;
    let provider = OpenAiProvider::new(stub.config()).unwrap();

    let err = provider.embed_text("hello").await.unwrap_err();
    match err {
        EmbedError::Api { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid api key"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body() {
    let stub = Stub::start(|_: &Value| Reply {
        status: 200,
        body: "this is not json".to_string(),
        delay: None,
    })
    .await;
    let provider = OpenAiProvider::new(stub.config()).unwrap();

    let err = provider.embed_text("hello").await.unwrap_err();
    assert!(matches!(err, EmbedError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_dimension_change_between_batches() {
    let stub = Stub::start(|body: &Value| {
        // First text of the second batch is "xxx", make that batch wider
        let width = if inputs(body).first().is_some_and(|t| t.len() == 3) { 4 } else { 3 };
        let data: Vec<Value> = inputs(body)
            .iter()
            .map(|_| json!({"embedding": vec![0.1f32; width]}))
            .collect();
        Reply::ok(json!({"data": data}))
    })
    .await;
    let provider = OpenAiProvider::new(stub.config().with_batch_size(2)).unwrap();

    let err = provider.embed_texts(&texts(3)).await.unwrap_err();
    assert!(matches!(
        err,
        EmbedError::DimensionMismatch {
            expected: 3,
            actual: 4
        }
    ));
}

#[tokio::test]
async fn test_timeout() {
    let stub = Stub::start(|body: &Value| Reply {
        delay: Some(Duration::from_secs(3)),
        ..echo_lengths(body)
    })
    .await;
    let provider = OpenAiProvider::new(stub.config().with_timeout_secs(1)).unwrap();

    let err = provider.embed_text("slow").await.unwrap_err();
    assert!(matches!(err, EmbedError::Timeout { seconds: 1 }), "got {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_missing_key_makes_no_request() {
    let stub = Stub::start(echo_lengths).await;
    let mut config = stub.config();
    config.api_key = None;
    let provider = OpenAiProvider::new(config).unwrap();

    let err = provider.embed_text("hello").await.unwrap_err();
    assert!(matches!(err, EmbedError::MissingApiKey));
    assert!(stub.bodies().is_empty());
}

#[tokio::test]
async fn test_custom_client() {
    let stub = Stub::start(echo_lengths).await;
    let client = reqwest::Client::builder().build().unwrap();
    let provider = OpenAiProvider::with_client(stub.config(), client);

    let embedding = provider.embed_text("abcd").await.unwrap();
    assert_eq!(embedding, vec![4.0, 1.0, 0.0]);
}
