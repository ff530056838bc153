//! Conversion between internal types and provider wire formats

pub mod completion;
pub mod openai;

use serde_json::Value;

use crate::error::LlmError;
use crate::protocol::completion::CompletionResponse;
use crate::protocol::openai::OpenAiResponse;
use crate::types::StreamFragment;

/// Extract a provider-reported error message from a JSON payload
///
/// Accepts both `{"error": {"message": "..."}}` and `{"error": "..."}`.
pub fn error_message(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        Value::Object(detail) => Some(
            detail
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| Value::Object(detail.clone()).to_string(), ToOwned::to_owned),
        ),
        other => Some(other.to_string()),
    }
}

/// Convert a complete (non-streaming) response body into fragments
///
/// The terminal `Done` is not included. Recognizes the `OpenAI` shape
/// (`choices[0].message`) and the single-completion shape (`response`).
///
/// # Errors
///
/// Returns `LlmError::ProviderRefusal` when the body carries an `error`
/// field and `LlmError::Transport` when it matches neither shape.
pub fn body_to_fragments(body: Value) -> Result<Vec<StreamFragment>, LlmError> {
    if let Some(message) = error_message(&body) {
        return Err(LlmError::ProviderRefusal(message));
    }

    if body.get("choices").is_some() {
        let response: OpenAiResponse = serde_json::from_value(body)
            .map_err(|e| LlmError::Transport(format!("failed to parse response: {e}")))?;
        return Ok(openai::response_to_fragments(response));
    }

    if body.get("response").is_some() {
        let response: CompletionResponse = serde_json::from_value(body)
            .map_err(|e| LlmError::Transport(format!("failed to parse response: {e}")))?;
        return Ok(completion::response_to_fragments(response));
    }

    Err(LlmError::Transport(
        "response carried neither `choices` nor `response`".to_owned(),
    ))
}
