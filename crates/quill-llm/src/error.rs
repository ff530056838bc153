use thiserror::Error;

/// Errors that can occur while generating structured output
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network failure, timeout, or non-2xx response from the provider
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider answered with a well-formed error payload
    #[error("provider refused request: {0}")]
    ProviderRefusal(String),

    /// The fragment consumer stopped the stream
    #[error("stream aborted by callback: {0}")]
    CallbackAborted(String),

    /// The caller cancelled the stream
    #[error("stream cancelled")]
    Cancelled,

    /// Model output contained no `{ ... }` span
    #[error("no JSON object found in model output")]
    NoJsonObject {
        /// Bounded prefix of the raw provider text
        preview: String,
    },

    /// Model output could not be decoded into the target type
    #[error("failed to decode model output: {reason}")]
    DecodeFailed {
        /// Decoder message from the last attempt
        reason: String,
        /// Bounded prefix of the raw provider text
        preview: String,
    },

    /// Dispatch to a tool name that is not registered
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A registered tool handler returned an error
    #[error("tool `{name}` failed: {message}")]
    ToolFailed { name: String, message: String },

    /// Request rejected before it was sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The model kept requesting tools past the configured bound
    #[error("model requested tools for more than {0} rounds")]
    ToolRoundsExceeded(u32),
}

impl LlmError {
    /// Whether retrying the same request later may succeed
    ///
    /// Only transport failures qualify. Retry policy itself belongs to the caller.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether the failure is about what the model wrote rather than how it was reached
    ///
    /// Callers log [`raw_output`](Self::raw_output) for these instead of showing a
    /// generic failure.
    pub const fn is_model_output(&self) -> bool {
        matches!(self, Self::NoJsonObject { .. } | Self::DecodeFailed { .. })
    }

    /// Bounded raw provider text attached to model-output failures
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::NoJsonObject { preview } | Self::DecodeFailed { preview, .. } => Some(preview),
            _ => None,
        }
    }
}

/// Truncate provider text to at most `max_len` bytes on a char boundary
pub fn preview(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_owned();
    }

    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}…", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_is_retryable() {
        assert!(LlmError::Transport("reset".to_owned()).is_retryable());
        assert!(!LlmError::ProviderRefusal("nope".to_owned()).is_retryable());
        assert!(!LlmError::Cancelled.is_retryable());
    }

    #[test]
    fn model_output_errors_expose_preview() {
        let err = LlmError::DecodeFailed {
            reason: "expected value".to_owned(),
            preview: "{oops".to_owned(),
        };
        assert!(err.is_model_output());
        assert_eq!(err.raw_output(), Some("{oops"));

        let err = LlmError::Transport("timeout".to_owned());
        assert!(!err.is_model_output());
        assert_eq!(err.raw_output(), None);
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdef", 3), "abc…");
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(preview("aé", 2), "a…");
    }
}
