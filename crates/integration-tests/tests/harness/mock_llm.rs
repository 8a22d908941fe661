//! Mock LLM backend server for integration tests
//!
//! Serves canned Chat Completions and Messages responses, single or
//! streamed, and records every request it receives

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// What the mock answers with
#[derive(Debug, Clone)]
pub enum Reply {
    /// Plain assistant text
    Text(String),
    /// A single tool call
    ToolCall { id: String, name: String, arguments: Value },
    /// One streamed text delta followed by a vendor error payload
    StreamError,
}

/// A request received by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: &'static str,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RecordedRequest {
    /// Header value as a string, if present
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Mock LLM backend that returns predictable responses
pub struct MockLlm {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockLlmState>,
}

struct MockLlmState {
    reply: Reply,
    fail_status: Option<StatusCode>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockLlm {
    /// Start a mock that answers "Hello from mock LLM"
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(Reply::Text("Hello from mock LLM".to_owned()), None).await
    }

    /// Start a mock with a custom reply
    pub async fn start_with(reply: Reply) -> anyhow::Result<Self> {
        Self::start_inner(reply, None).await
    }

    /// Start a mock that rejects every request with `status`
    pub async fn start_failing(status: StatusCode) -> anyhow::Result<Self> {
        Self::start_inner(Reply::Text(String::new()), Some(status)).await
    }

    async fn start_inner(reply: Reply, fail_status: Option<StatusCode>) -> anyhow::Result<Self> {
        let state = Arc::new(MockLlmState {
            reply,
            fail_status,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .route("/v1/messages", routing::post(handle_messages))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as a provider
    ///
    /// Includes `/v1` since both providers append their endpoint path
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Most recent request
    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("mock received no requests")
    }
}

impl Drop for MockLlm {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl MockLlmState {
    fn record(&self, path: &'static str, headers: HeaderMap, body: &Value) {
        self.requests.lock().unwrap().push(RecordedRequest {
            path,
            headers,
            body: body.clone(),
        });
    }
}

fn wants_stream(body: &Value) -> bool {
    body["stream"].as_bool().unwrap_or(false)
}

/// Split text into word-sized deltas that concatenate back to the original
fn deltas(text: &str) -> Vec<&str> {
    text.split_inclusive(' ').collect()
}

/// Two fragments of the serialized arguments
fn fragments(arguments: &Value) -> (String, String) {
    let raw = arguments.to_string();
    let (head, tail) = raw.split_at(raw.len() / 2);
    (head.to_owned(), tail.to_owned())
}

fn sse(events: &[(Option<String>, Value)], trailer: Option<&str>) -> Response {
    let mut body = String::new();
    for (event, data) in events {
        if let Some(event) = event {
            body.push_str(&format!("event: {event}\n"));
        }
        body.push_str(&format!("data: {data}\n\n"));
    }
    if let Some(trailer) = trailer {
        body.push_str(&format!("data: {trailer}\n\n"));
    }

    (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

// -- Chat Completions --

async fn handle_chat_completions(
    State(state): State<Arc<MockLlmState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("/v1/chat/completions", headers, &body);

    if let Some(status) = state.fail_status {
        let error = json!({"error": {"message": "mock server intentional failure", "type": "server_error"}});
        return (status, Json(error)).into_response();
    }

    let model = body["model"].as_str().unwrap_or_default().to_owned();

    if wants_stream(&body) {
        return openai_stream(&model, &state.reply);
    }

    let (message, finish_reason) = match &state.reply {
        Reply::Text(text) => (json!({"role": "assistant", "content": text}), "stop"),
        Reply::ToolCall { id, name, arguments } => (
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments.to_string()}
                }]
            }),
            "tool_calls",
        ),
        Reply::StreamError => {
            let error = json!({"error": {"message": "stream-only reply", "type": "invalid_request_error"}});
            return (StatusCode::BAD_REQUEST, Json(error)).into_response();
        }
    };

    Json(json!({
        "id": "chatcmpl-test-123",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }))
    .into_response()
}

fn openai_chunk(model: &str, delta: Value, finish_reason: Option<&str>) -> (Option<String>, Value) {
    let data = json!({
        "id": "chatcmpl-test-stream",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
    });
    (None, data)
}

fn openai_stream(model: &str, reply: &Reply) -> Response {
    let mut events = vec![openai_chunk(model, json!({"role": "assistant", "content": ""}), None)];

    let finish_reason = match reply {
        Reply::Text(text) => {
            for delta in deltas(text) {
                events.push(openai_chunk(model, json!({"content": delta}), None));
            }
            "stop"
        }
        Reply::ToolCall { id, name, arguments } => {
            let (head, tail) = fragments(arguments);
            events.push(openai_chunk(
                model,
                json!({"tool_calls": [{"index": 0, "id": id, "type": "function", "function": {"name": name, "arguments": ""}}]}),
                None,
            ));
            for fragment in [head, tail] {
                events.push(openai_chunk(
                    model,
                    json!({"tool_calls": [{"index": 0, "function": {"arguments": fragment}}]}),
                    None,
                ));
            }
            "tool_calls"
        }
        Reply::StreamError => {
            events.push(openai_chunk(model, json!({"content": "Hel"}), None));
            events.push((None, json!({"error": {"message": "mock overloaded", "type": "server_error"}})));
            return sse(&events, None);
        }
    };

    events.push(openai_chunk(model, json!({}), Some(finish_reason)));
    events.push((
        None,
        json!({
            "id": "chatcmpl-test-stream",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": model,
            "choices": [],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }),
    ));

    sse(&events, Some("[DONE]"))
}

// -- Messages --

async fn handle_messages(State(state): State<Arc<MockLlmState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("/v1/messages", headers, &body);

    if let Some(status) = state.fail_status {
        let error = json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}});
        return (status, Json(error)).into_response();
    }

    let model = body["model"].as_str().unwrap_or_default().to_owned();

    if wants_stream(&body) {
        return anthropic_stream(&model, &state.reply);
    }

    let (content, stop_reason) = match &state.reply {
        Reply::Text(text) => (json!([{"type": "text", "text": text}]), "end_turn"),
        Reply::ToolCall { id, name, arguments } => (
            json!([
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": id, "name": name, "input": arguments}
            ]),
            "tool_use",
        ),
        Reply::StreamError => {
            let error = json!({"type": "error", "error": {"type": "invalid_request_error", "message": "stream-only reply"}});
            return (StatusCode::BAD_REQUEST, Json(error)).into_response();
        }
    };

    Json(json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "model": model,
        "content": content,
        "stop_reason": stop_reason,
        "stop_sequence": null,
        "usage": {"input_tokens": 10, "output_tokens": 5}
    }))
    .into_response()
}

fn anthropic_event(data: Value) -> (Option<String>, Value) {
    let event = data["type"].as_str().map(str::to_owned);
    (event, data)
}

fn anthropic_stream(model: &str, reply: &Reply) -> Response {
    let mut events = vec![
        anthropic_event(json!({
            "type": "message_start",
            "message": {
                "id": "msg_mock",
                "type": "message",
                "role": "assistant",
                "model": model,
                "content": [],
                "stop_reason": null,
                "usage": {"input_tokens": 10, "output_tokens": 1}
            }
        })),
        anthropic_event(json!({"type": "ping"})),
    ];

    let stop_reason = match reply {
        Reply::Text(text) => {
            events.push(anthropic_event(
                json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
            ));
            for delta in deltas(text) {
                events.push(anthropic_event(
                    json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": delta}}),
                ));
            }
            events.push(anthropic_event(json!({"type": "content_block_stop", "index": 0})));
            "end_turn"
        }
        Reply::ToolCall { id, name, arguments } => {
            let (head, tail) = fragments(arguments);
            events.push(anthropic_event(json!({
                "type": "content_block_start",
                "index": 0,
                "content_block": {"type": "tool_use", "id": id, "name": name, "input": {}}
            })));
            for fragment in [head, tail] {
                events.push(anthropic_event(json!({
                    "type": "content_block_delta",
                    "index": 0,
                    "delta": {"type": "input_json_delta", "partial_json": fragment}
                })));
            }
            events.push(anthropic_event(json!({"type": "content_block_stop", "index": 0})));
            "tool_use"
        }
        Reply::StreamError => {
            events.push(anthropic_event(
                json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
            ));
            events.push(anthropic_event(
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hel"}}),
            ));
            events.push(anthropic_event(
                json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
            ));
            return sse(&events, None);
        }
    };

    events.push(anthropic_event(json!({
        "type": "message_delta",
        "delta": {"stop_reason": stop_reason, "stop_sequence": null},
        "usage": {"output_tokens": 5}
    })));
    events.push(anthropic_event(json!({"type": "message_stop"})));

    sse(&events, None)
}
