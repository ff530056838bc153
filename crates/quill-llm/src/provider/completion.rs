//! Single-completion provider (`/api/generate` style endpoints)

use async_trait::async_trait;
use quill_config::LlmConfig;
use reqwest::Client;
use secrecy::SecretString;
use url::Url;

use super::{Provider, ProviderCapabilities, emit_body, endpoint, post_json};
use crate::error::LlmError;
use crate::protocol::completion::CompletionRequest;
use crate::sink::FragmentSink;
use crate::types::GenerationRequest;

/// Default local completion endpoint
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Provider for single-shot completion APIs
///
/// The whole response arrives in one body. Stream-flagged requests are served
/// the same way, as one text fragment followed by `Done`.
pub struct CompletionProvider {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl CompletionProvider {
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
}

#[async_trait]
impl Provider for CompletionProvider {
    fn name(&self) -> &str {
        "completion"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: false,
            tool_calling: false,
        }
    }

    async fn execute(&self, request: &GenerationRequest, sink: &mut dyn FragmentSink) -> Result<(), LlmError> {
        if !request.tools.is_empty() {
            tracing::debug!(
                provider = self.name(),
                tools = request.tools.len(),
                "provider has no tool calling, ignoring tool definitions"
            );
        }

        let wire_request = CompletionRequest::from(request);
        let url = endpoint(&self.base_url, "api/generate");
        let response = post_json(&self.client, self.name(), &url, self.api_key.as_ref(), &wire_request).await?;

        emit_body(response, sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_single_shot_capabilities() {
        let provider = CompletionProvider::with_base_url(Url::parse("http://localhost:11434").unwrap(), None);
        let caps = provider.capabilities();

        assert!(!caps.streaming);
        assert!(!caps.tool_calling);
        assert_eq!(provider.name(), "completion");
    }
}
