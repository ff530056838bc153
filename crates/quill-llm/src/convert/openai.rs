//! Conversion between internal types and `OpenAI` wire format

use std::collections::BTreeMap;

use crate::protocol::openai::{
    OpenAiFunction, OpenAiFunctionCall, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk,
    OpenAiStreamToolCall, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};
use crate::types::{GenerationRequest, Message, StreamFragment, ToolCall, Usage};

// -- Outbound: internal request -> OpenAI wire request --

impl From<&GenerationRequest> for OpenAiRequest {
    fn from(req: &GenerationRequest) -> Self {
        let system = (!req.system_prompt.is_empty()).then(|| OpenAiMessage {
            role: "system".to_owned(),
            content: Some(req.system_prompt.clone()),
            tool_calls: None,
            tool_call_id: None,
        });

        let tools = (!req.tools.is_empty()).then(|| {
            req.tools
                .iter()
                .map(|t| OpenAiTool {
                    tool_type: "function".to_owned(),
                    function: OpenAiFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect()
        });

        Self {
            model: req.options.model.clone(),
            messages: system.into_iter().chain(req.messages.iter().map(Into::into)).collect(),
            temperature: req.options.temperature,
            max_tokens: req.options.max_tokens,
            stream: req.options.stream.then_some(true),
            tools,
            stream_options: None,
        }
    }
}

impl From<&Message> for OpenAiMessage {
    fn from(msg: &Message) -> Self {
        let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
            msg.tool_calls
                .iter()
                .map(|tc| OpenAiToolCall {
                    id: tc.id.clone(),
                    tool_type: "function".to_owned(),
                    function: OpenAiFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    },
                })
                .collect()
        });

        Self {
            role: msg.role.as_str().to_owned(),
            content: Some(msg.content.clone()),
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

impl From<OpenAiUsage> for Usage {
    fn from(usage: OpenAiUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

// -- Inbound: complete response --

/// Convert a non-streaming response into fragments (without `Done`)
pub fn response_to_fragments(response: OpenAiResponse) -> Vec<StreamFragment> {
    let mut fragments = Vec::new();

    if let Some(choice) = response.choices.into_iter().next() {
        if let Some(content) = choice.message.content.filter(|c| !c.is_empty()) {
            fragments.push(StreamFragment::TextDelta(content));
        }

        for (index, call) in choice.message.tool_calls.unwrap_or_default().into_iter().enumerate() {
            let id = if call.id.is_empty() { fallback_call_id(index) } else { call.id };
            fragments.push(StreamFragment::ToolCallRequest(ToolCall {
                id,
                name: call.function.name,
                arguments: call.function.arguments,
            }));
        }
    }

    if let Some(usage) = response.usage {
        fragments.push(StreamFragment::Usage(usage.into()));
    }

    fragments
}

// -- Inbound: stream chunks --

/// Partially received tool call
#[derive(Debug, Default)]
struct PartialCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Stateful converter from stream chunks to fragments
///
/// Tool-call arguments arrive split across chunks; they are buffered per
/// call index and released as whole `ToolCallRequest`s once the choice
/// reports a finish reason (or the stream ends).
#[derive(Debug, Default)]
pub struct ChunkConverter {
    pending: BTreeMap<u32, PartialCall>,
}

impl ChunkConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert one parsed chunk, in arrival order
    pub fn convert(&mut self, chunk: OpenAiStreamChunk) -> Vec<StreamFragment> {
        let mut fragments = Vec::new();

        for choice in chunk.choices {
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                fragments.push(StreamFragment::TextDelta(content));
            }

            if let Some(calls) = choice.delta.tool_calls {
                self.absorb(calls);
            }

            if choice.finish_reason.is_some() {
                fragments.extend(self.finish());
            }
        }

        if let Some(usage) = chunk.usage {
            fragments.push(StreamFragment::Usage(usage.into()));
        }

        fragments
    }

    /// Release any buffered tool calls
    pub fn finish(&mut self) -> Vec<StreamFragment> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .filter_map(|(index, partial)| {
                let Some(name) = partial.name else {
                    tracing::debug!(index, "dropping streamed tool call without a name");
                    return None;
                };

                Some(StreamFragment::ToolCallRequest(ToolCall {
                    id: partial.id.unwrap_or_else(|| fallback_call_id(index as usize)),
                    name,
                    arguments: partial.arguments,
                }))
            })
            .collect()
    }

    fn absorb(&mut self, calls: Vec<OpenAiStreamToolCall>) {
        for call in calls {
            let partial = self.pending.entry(call.index).or_default();

            if let Some(id) = call.id {
                partial.id = Some(id);
            }

            if let Some(function) = call.function {
                if let Some(name) = function.name {
                    partial.name = Some(name);
                }
                if let Some(arguments) = function.arguments {
                    partial.arguments.push_str(&arguments);
                }
            }
        }
    }
}

fn fallback_call_id(index: usize) -> String {
    format!("call_{index}")
}
