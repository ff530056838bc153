use serde::{Deserialize, Serialize};

use super::message::ToolCall;

/// Unit pushed by the transport while a response is in flight
///
/// Exactly one `Done` or `Error` ends a stream; everything before it arrives
/// in provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamFragment {
    /// Incremental text
    TextDelta(String),
    /// Provider session metadata, passed through opaquely
    SessionInfo(serde_json::Value),
    /// The model asked for a tool invocation
    ToolCallRequest(ToolCall),
    /// Token accounting
    Usage(Usage),
    /// Normal completion
    Done,
    /// Provider-reported failure
    Error(String),
}

impl StreamFragment {
    /// Whether this fragment ends the stream
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens used
    pub total_tokens: u32,
}

impl Usage {
    /// Sum two usage reports, e.g. across tool rounds
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens.saturating_add(other.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(other.completion_tokens),
            total_tokens: self.total_tokens.saturating_add(other.total_tokens),
        }
    }
}
