//! Programmatic configuration builder for integration tests

use std::time::Duration;

use quill_config::{LlmConfig, ProviderKind};
use secrecy::SecretString;

use super::mock_llm::MockLlm;

/// Builder for LLM configurations pointed at a [`MockLlm`]
pub struct ConfigBuilder {
    config: LlmConfig,
}

impl ConfigBuilder {
    /// OpenAI-compatible provider at the mock's `/v1` base
    pub fn openai(mock: &MockLlm) -> Self {
        Self::with_provider(ProviderKind::Openai, mock.openai_url())
    }

    /// Single-completion provider at the mock's root
    pub fn completion(mock: &MockLlm) -> Self {
        Self::with_provider(ProviderKind::Completion, mock.completion_url())
    }

    fn with_provider(provider: ProviderKind, base_url: url::Url) -> Self {
        Self {
            config: LlmConfig {
                provider,
                api_key: Some(SecretString::from("test-key")),
                base_url: Some(base_url),
                model: "mock-model".to_owned(),
                temperature: 0.2,
                ..LlmConfig::default()
            },
        }
    }

    /// Ceiling for blocking calls
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    pub fn max_tool_rounds(mut self, rounds: u32) -> Self {
        self.config.max_tool_rounds = rounds;
        self
    }

    pub fn preview_len(mut self, len: usize) -> Self {
        self.config.preview_len = len;
        self
    }

    pub fn build(self) -> LlmConfig {
        self.config
    }
}
