//! Mock OpenAI-compatible chat completions server.
//!
//! Binds an ephemeral localhost port and answers `/v1/chat/completions`
//! according to a configurable mode, recording every request it receives.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Clone, Debug)]
pub enum MockMode {
    /// 200 with this assistant message
    Reply(String),
    /// 200 with no choices
    Empty,
    /// Error status with an OpenAI-style error body
    Error(u16, String),
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    mode: Arc<RwLock<MockMode>>,
    delay: Option<Duration>,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

pub struct MockChatServer {
    pub base_url: String,
    state: MockState,
}

impl MockChatServer {
    pub async fn start(mode: MockMode) -> Self {
        Self::start_with_delay(mode, None).await
    }

    pub async fn start_with_delay(mode: MockMode, delay: Option<Duration>) -> Self {
        let state = MockState {
            mode: Arc::new(RwLock::new(mode)),
            delay,
            requests: Arc::new(RwLock::new(Vec::new())),
        };

        let app = Router::new()
            .route("/v1/chat/completions", post(completions_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/v1"),
            state,
        }
    }

    pub async fn set_mode(&self, mode: MockMode) {
        *self.state.mode.write().await = mode;
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.read().await.clone()
    }
}

async fn completions_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.requests.write().await.push(RecordedRequest {
        authorization: headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: body.clone(),
    });

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    let mode = state.mode.read().await.clone();
    match mode {
        MockMode::Reply(content) => Json(json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "model": body["model"],
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        }))
        .into_response(),
        MockMode::Empty => Json(json!({ "id": "chatcmpl-test", "choices": [] })).into_response(),
        MockMode::Error(status, message) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({ "error": { "message": message, "type": "test_error" } })),
            )
                .into_response()
        }
    }
}
