use quill_config::LlmConfig;
use serde::{Deserialize, Serialize};

use super::message::Message;
use super::tool::FunctionDefinition;
use crate::error::LlmError;

/// Inclusive temperature bounds accepted by providers
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;

/// Parameters controlling text generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    /// Model identifier
    pub model: String,
    /// Sampling temperature (0.0 to 2.0)
    pub temperature: f64,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whether to request an incremental response
    #[serde(default)]
    pub stream: bool,
}

impl SamplingOptions {
    pub fn new(model: impl Into<String>, temperature: f64) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens: None,
            stream: false,
        }
    }

    /// Sampling defaults taken from configuration
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: false,
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Provider-agnostic generation request
///
/// Built once per call and passed by reference; follow-up turns (tool results)
/// produce a new request through [`GenerationRequest::continued`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// System prompt, sent ahead of `messages`
    pub system_prompt: String,
    /// Conversation messages in order
    pub messages: Vec<Message>,
    /// Sampling parameters
    pub options: SamplingOptions,
    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<FunctionDefinition>,
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, messages: Vec<Message>, options: SamplingOptions) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages,
            options,
            tools: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<FunctionDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Copy of this request with `extra` appended to the conversation
    #[must_use]
    pub fn continued(&self, extra: impl IntoIterator<Item = Message>) -> Self {
        let mut next = self.clone();
        next.messages.extend(extra);
        next
    }

    /// Reject requests no provider would accept
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidRequest` for an empty model name, an
    /// out-of-range temperature, or a zero token cap.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.options.model.trim().is_empty() {
            return Err(LlmError::InvalidRequest("model must not be empty".to_owned()));
        }

        if !TEMPERATURE_RANGE.contains(&self.options.temperature) {
            return Err(LlmError::InvalidRequest(format!(
                "temperature {} outside [0, 2]",
                self.options.temperature
            )));
        }

        if self.options.max_tokens == Some(0) {
            return Err(LlmError::InvalidRequest("max_tokens must be positive".to_owned()));
        }

        Ok(())
    }
}
