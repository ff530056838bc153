//! OpenAI-compatible provider implementation

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use quill_config::LlmConfig;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use secrecy::SecretString;
use url::Url;

use super::{Provider, ProviderCapabilities, emit_body, endpoint, post_json};
use crate::convert::error_message;
use crate::convert::openai::ChunkConverter;
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiRequest, OpenAiStreamChunk, OpenAiStreamOptions};
use crate::sink::{FragmentSink, deliver};
use crate::types::{GenerationRequest, StreamFragment};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Whether the provider is the canonical OpenAI API (vs a compatible third-party)
fn is_canonical_openai(base_url: &Url) -> bool {
    base_url.host_str().is_some_and(|h| h == "api.openai.com")
}

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl OpenAiProvider {
    /// Create from LLM configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidRequest` if no usable base URL is available.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| LlmError::InvalidRequest(format!("invalid default base URL: {e}")))?,
        };

        Ok(Self::with_base_url(base_url, config.api_key.clone()))
    }

    /// Create against an explicit endpoint
    pub fn with_base_url(base_url: Url, api_key: Option<SecretString>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    /// Read an SSE body, pushing fragments as frames decode
    async fn read_stream(&self, response: reqwest::Response, sink: &mut dyn FragmentSink) -> Result<(), LlmError> {
        let mut events = response.bytes_stream().eventsource();
        let mut converter = ChunkConverter::new();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| {
                tracing::warn!(provider = self.name(), error = %e, "stream interrupted");
                LlmError::Transport(format!("stream interrupted: {e}"))
            })?;

            match interpret_frame(&event.event, &event.data, &mut converter)? {
                Frame::Fragments(fragments) => {
                    for fragment in fragments {
                        deliver(sink, fragment).await?;
                    }
                }
                Frame::Done => {
                    for fragment in converter.finish() {
                        deliver(sink, fragment).await?;
                    }
                    return deliver(sink, StreamFragment::Done).await;
                }
            }
        }

        // Connection closed without a terminal frame; the transport decides what that means
        tracing::debug!(provider = self.name(), "stream ended without a done frame");
        for fragment in converter.finish() {
            deliver(sink, fragment).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            tool_calling: true,
        }
    }

    async fn execute(&self, request: &GenerationRequest, sink: &mut dyn FragmentSink) -> Result<(), LlmError> {
        let mut wire_request = OpenAiRequest::from(request);

        // Only canonical OpenAI accepts stream_options; many compatible
        // APIs reject it
        if request.options.stream && is_canonical_openai(&self.base_url) {
            wire_request.stream_options = Some(OpenAiStreamOptions { include_usage: true });
        }

        let url = endpoint(&self.base_url, "chat/completions");
        let response = post_json(&self.client, self.name(), &url, self.api_key.as_ref(), &wire_request).await?;

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));

        if request.options.stream && is_event_stream {
            self.read_stream(response, sink).await
        } else {
            emit_body(response, sink).await
        }
    }
}

/// Meaning of one SSE frame
#[derive(Debug, PartialEq)]
enum Frame {
    /// Zero or more fragments to deliver
    Fragments(Vec<StreamFragment>),
    /// The provider signalled completion
    Done,
}

/// Interpret one SSE frame
///
/// `event_type` is `message` when the frame had no `event:` line.
fn interpret_frame(event_type: &str, data: &str, converter: &mut ChunkConverter) -> Result<Frame, LlmError> {
    let data = data.trim();

    match event_type {
        "done" => return Ok(Frame::Done),
        "error" => {
            let message = serde_json::from_str(data)
                .ok()
                .and_then(|value: serde_json::Value| {
                    error_message(&value).or_else(|| value.get("message")?.as_str().map(ToOwned::to_owned))
                })
                .unwrap_or_else(|| data.to_owned());
            return Err(LlmError::ProviderRefusal(message));
        }
        "session" | "metadata" => {
            let info = serde_json::from_str(data).unwrap_or_else(|_| serde_json::Value::String(data.to_owned()));
            return Ok(Frame::Fragments(vec![StreamFragment::SessionInfo(info)]));
        }
        _ => {}
    }

    if data == "[DONE]" {
        return Ok(Frame::Done);
    }

    if data.is_empty() {
        return Ok(Frame::Fragments(Vec::new()));
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
            return Ok(Frame::Fragments(Vec::new()));
        }
    };

    if let Some(message) = error_message(&value) {
        return Err(LlmError::ProviderRefusal(message));
    }

    match serde_json::from_value::<OpenAiStreamChunk>(value) {
        Ok(chunk) => Ok(Frame::Fragments(converter.convert(chunk))),
        Err(e) => {
            tracing::debug!(error = %e, data = %data, "skipping SSE chunk with unexpected shape");
            Ok(Frame::Fragments(Vec::new()))
        }
    }
}
