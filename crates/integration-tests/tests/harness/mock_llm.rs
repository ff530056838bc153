//! Mock LLM provider for integration tests
//!
//! Serves both the OpenAI-compatible `/v1/chat/completions` endpoint and the
//! single-completion `/api/generate` endpoint. Each request consumes the next
//! scripted [`Reply`]; every request body is recorded for assertions.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// One scripted answer
#[derive(Debug, Clone)]
pub enum Reply {
    /// Chat completion whose message content is the given text
    Content(String),
    /// Chat completion asking for one tool call
    ToolCall { id: String, name: String, arguments: String },
    /// SSE stream with one content delta per entry, then usage and `[DONE]`
    Stream(Vec<String>),
    /// SSE stream asking for one tool call, arguments split across chunks
    StreamToolCall { id: String, name: String, argument_parts: Vec<String> },
    /// Raw SSE frames as `(event type, data)`, sent as-is
    Frames(Vec<(Option<String>, String)>),
    /// SSE content deltas with a pause before each one
    SlowStream { deltas: Vec<String>, delay: Duration },
    /// Arbitrary status and JSON body
    Status(u16, Value),
    /// Chat completion sent after a pause
    Delayed(Duration, String),
    /// Single-completion body with the given text
    Completion(String),
}

impl Reply {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content(text.into())
    }

    pub fn stream<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stream(deltas.into_iter().map(Into::into).collect())
    }

    pub fn tool_call(id: &str, name: &str, arguments: &str) -> Self {
        Self::ToolCall {
            id: id.to_owned(),
            name: name.to_owned(),
            arguments: arguments.to_owned(),
        }
    }
}

/// Mock provider bound to an ephemeral local port
pub struct MockLlm {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Value>>,
    frames_sent: AtomicUsize,
    stream_dropped: AtomicBool,
}

impl MockLlm {
    /// Start the mock server with a reply script
    pub async fn start(replies: Vec<Reply>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            replies: Mutex::new(replies.into()),
            ..MockState::default()
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle))
            .route("/api/generate", routing::post(handle))
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

    /// Base URL for the OpenAI-compatible provider (includes `/v1`)
    pub fn openai_url(&self) -> url::Url {
        url::Url::parse(&format!("http://{}/v1", self.addr)).expect("mock address is a valid URL")
    }

    /// Base URL for the single-completion provider
    pub fn completion_url(&self) -> url::Url {
        url::Url::parse(&format!("http://{}", self.addr)).expect("mock address is a valid URL")
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Frames written by slow streams
    pub fn frames_sent(&self) -> usize {
        self.state.frames_sent.load(Ordering::SeqCst)
    }

    /// Whether a slow stream body was dropped by the server
    pub fn stream_dropped(&self) -> bool {
        self.state.stream_dropped.load(Ordering::SeqCst)
    }
}

impl Drop for MockLlm {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.requests.lock().unwrap().push(body.clone());
    let reply = state.replies.lock().unwrap().pop_front();

    let Some(reply) = reply else {
        return error_status(StatusCode::INTERNAL_SERVER_ERROR, "no scripted reply");
    };

    let model = body.get("model").and_then(Value::as_str).unwrap_or("mock-model").to_owned();

    match reply {
        Reply::Content(text) => Json(chat_body(&model, json!({"role": "assistant", "content": text}), "stop")).into_response(),
        Reply::ToolCall { id, name, arguments } => Json(chat_body(
            &model,
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{"id": id, "type": "function", "function": {"name": name, "arguments": arguments}}]
            }),
            "tool_calls",
        ))
        .into_response(),
        Reply::Stream(deltas) => {
            let mut frames: Vec<String> = deltas.iter().map(|d| data(&content_chunk(d))).collect();
            frames.push(data(&finish_chunk("stop")));
            frames.push(data(&usage_chunk()));
            frames.push("data: [DONE]\n\n".to_owned());
            sse(frames.concat())
        }
        Reply::StreamToolCall { id, name, argument_parts } => {
            let mut frames = vec![data(&json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": id, "type": "function", "function": {"name": name, "arguments": ""}}
            ]}}]}))];
            frames.extend(argument_parts.iter().map(|part| {
                data(&json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                    {"index": 0, "function": {"arguments": part}}
                ]}}]}))
            }));
            frames.push(data(&finish_chunk("tool_calls")));
            frames.push("data: [DONE]\n\n".to_owned());
            sse(frames.concat())
        }
        Reply::Frames(frames) => sse(frames
            .iter()
            .map(|(event, payload)| match event {
                Some(event) => format!("event: {event}\ndata: {payload}\n\n"),
                None => format!("data: {payload}\n\n"),
            })
            .collect()),
        Reply::SlowStream { deltas, delay } => slow_sse(&state, deltas, delay),
        Reply::Status(status, body) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(body)).into_response()
        }
        Reply::Delayed(delay, text) => {
            tokio::time::sleep(delay).await;
            Json(chat_body(&model, json!({"role": "assistant", "content": text}), "stop")).into_response()
        }
        Reply::Completion(text) => Json(json!({
            "model": model,
            "response": text,
            "done": true,
            "prompt_eval_count": 7,
            "eval_count": 3
        }))
        .into_response(),
    }
}

fn chat_body(model: &str, message: Value, finish_reason: &str) -> Value {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

fn content_chunk(delta: &str) -> Value {
    json!({"object": "chat.completion.chunk", "choices": [{"index": 0, "delta": {"content": delta}}]})
}

fn finish_chunk(reason: &str) -> Value {
    json!({"object": "chat.completion.chunk", "choices": [{"index": 0, "delta": {}, "finish_reason": reason}]})
}

fn usage_chunk() -> Value {
    json!({"choices": [], "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}})
}

fn data(value: &Value) -> String {
    format!("data: {value}\n\n")
}

fn sse(body: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

fn error_status(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": {"message": message, "type": "server_error"}}))).into_response()
}

/// Marks the stream as dropped when the body is released
struct DropFlag(Arc<MockState>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.stream_dropped.store(true, Ordering::SeqCst);
    }
}

fn slow_sse(state: &Arc<MockState>, deltas: Vec<String>, delay: Duration) -> Response {
    let flag = Arc::new(DropFlag(Arc::clone(state)));

    let frames = futures_util::stream::iter(deltas).then(move |delta| {
        let flag = Arc::clone(&flag);
        async move {
            tokio::time::sleep(delay).await;
            flag.0.frames_sent.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(data(&content_chunk(&delta)))
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(frames))
        .expect("static response parts are valid")
}
