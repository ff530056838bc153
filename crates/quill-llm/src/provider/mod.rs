//! Provider trait and implementations for LLM backends

pub mod completion;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use quill_config::{LlmConfig, ProviderKind};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::convert::{body_to_fragments, error_message};
use crate::error::LlmError;
use crate::sink::{FragmentSink, deliver};
use crate::types::{GenerationRequest, StreamFragment};

pub use completion::CompletionProvider;
pub use openai::OpenAiProvider;

/// Capabilities advertised by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Whether the provider can deliver text incrementally
    pub streaming: bool,
    /// Whether the provider supports tool/function calling
    pub tool_calling: bool,
}

/// Trait implemented by each LLM provider backend
///
/// There is one entry point for both modes: the request's `stream` flag picks
/// the wire shape, and every decoded unit is pushed into `sink` in arrival
/// order. Blocking callers pass a collecting sink.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Advertised capabilities
    fn capabilities(&self) -> ProviderCapabilities;

    /// Send the request and push fragments into `sink`
    ///
    /// Implementations emit `Done` on clean completion and never emit
    /// `Error`; failures are returned and the transport reports them.
    async fn execute(&self, request: &GenerationRequest, sink: &mut dyn FragmentSink) -> Result<(), LlmError>;
}

/// Build the provider selected in configuration
///
/// # Errors
///
/// Returns `LlmError::InvalidRequest` if the configured base URL cannot be used.
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn Provider>, LlmError> {
    let provider: Arc<dyn Provider> = match config.provider {
        ProviderKind::Openai => Arc::new(OpenAiProvider::new(config)?),
        ProviderKind::Completion => Arc::new(CompletionProvider::new(config)?),
    };

    tracing::debug!(provider = provider.name(), model = %config.model, "provider configured");

    Ok(provider)
}

/// Join a base URL and an endpoint path without doubling slashes
fn endpoint(base_url: &url::Url, path: &str) -> String {
    let base = base_url.as_str().trim_end_matches('/');
    format!("{base}/{}", path.trim_start_matches('/'))
}

/// POST a JSON body and fail on transport errors and non-2xx statuses
async fn post_json<T: Serialize + Sync>(
    client: &Client,
    provider: &str,
    url: &str,
    api_key: Option<&SecretString>,
    body: &T,
) -> Result<reqwest::Response, LlmError> {
    let mut builder = client.post(url).json(body);

    if let Some(key) = api_key {
        builder = builder.bearer_auth(key.expose_secret());
    }

    let response = builder.send().await.map_err(|e| {
        tracing::error!(provider, error = %e, "upstream request failed");
        LlmError::Transport(e.to_string())
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str(&body)
        .ok()
        .and_then(|value| error_message(&value))
        .unwrap_or(body);

    tracing::warn!(provider, status = %status, "upstream returned error");

    Err(LlmError::Transport(format!("provider returned {status}: {message}")))
}

/// Read a complete JSON body and emit its fragments followed by `Done`
async fn emit_body(response: reqwest::Response, sink: &mut dyn FragmentSink) -> Result<(), LlmError> {
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| LlmError::Transport(format!("failed to read response: {e}")))?;

    for fragment in body_to_fragments(body)? {
        deliver(sink, fragment).await?;
    }

    deliver(sink, StreamFragment::Done).await
}
