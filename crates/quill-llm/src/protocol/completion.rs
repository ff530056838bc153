//! Single-completion (`/api/generate`) wire format types

use serde::{Deserialize, Serialize};

/// Single-shot completion request
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Flattened conversation text
    pub prompt: String,
    /// System prompt
    #[serde(skip_serializing_if = "String::is_empty")]
    pub system: String,
    /// Always `false`; this shape is served single-shot
    pub stream: bool,
    /// Sampling options
    pub options: CompletionOptions,
}

/// Sampling options for the completion shape
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOptions {
    /// Sampling temperature
    pub temperature: f64,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Single-shot completion response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    #[serde(default)]
    pub response: Option<String>,
    /// Tokens evaluated from the prompt
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    /// Tokens generated
    #[serde(default)]
    pub eval_count: Option<u32>,
}
