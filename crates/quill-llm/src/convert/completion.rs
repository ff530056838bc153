//! Conversion between internal types and the single-completion wire format

use crate::protocol::completion::{CompletionOptions, CompletionRequest, CompletionResponse};
use crate::types::{GenerationRequest, Role, StreamFragment, Usage};

impl From<&GenerationRequest> for CompletionRequest {
    fn from(req: &GenerationRequest) -> Self {
        let system = std::iter::once(req.system_prompt.as_str())
            .chain(
                req.messages
                    .iter()
                    .filter(|m| m.role == Role::System)
                    .map(|m| m.content.as_str()),
            )
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        let turns: Vec<_> = req.messages.iter().filter(|m| m.role != Role::System).collect();

        // A lone user turn is sent verbatim; longer conversations are labelled
        let prompt = match turns.as_slice() {
            [only] if only.role == Role::User => only.content.clone(),
            _ => turns
                .iter()
                .map(|m| {
                    let label = match m.role {
                        Role::Assistant => "Assistant",
                        Role::Tool => "Tool result",
                        Role::User | Role::System => "User",
                    };
                    format!("{label}: {}", m.content)
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        };

        Self {
            model: req.options.model.clone(),
            prompt,
            system,
            stream: false,
            options: CompletionOptions {
                temperature: req.options.temperature,
                num_predict: req.options.max_tokens,
            },
        }
    }
}

/// Convert a single-completion response into fragments (without `Done`)
pub fn response_to_fragments(response: CompletionResponse) -> Vec<StreamFragment> {
    let mut fragments = Vec::new();

    if let Some(text) = response.response.filter(|t| !t.is_empty()) {
        fragments.push(StreamFragment::TextDelta(text));
    }

    if response.prompt_eval_count.is_some() || response.eval_count.is_some() {
        let prompt_tokens = response.prompt_eval_count.unwrap_or(0);
        let completion_tokens = response.eval_count.unwrap_or(0);
        fragments.push(StreamFragment::Usage(Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }));
    }

    fragments
}
