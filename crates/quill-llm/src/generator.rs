//! Structured generation over the transport
//!
//! [`Generator`] sends a request, runs any tool calls the model asks for,
//! and decodes the final text into the caller's type.

use std::borrow::Cow;

use async_trait::async_trait;
use quill_config::LlmConfig;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::decode::{DEFAULT_PREVIEW_LEN, decode};
use crate::error::LlmError;
use crate::prompt::{PromptTemplate, build};
use crate::sink::{Collector, Completion, FragmentSink, deliver};
use crate::tools::ToolRegistry;
use crate::transport::Transport;
use crate::types::{GenerationRequest, Message, SamplingOptions, StreamFragment, ToolCall, Usage};

/// Default bound on model/tool round trips per call
pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 5;

/// Structured-generation entry point
#[derive(Debug, Clone)]
pub struct Generator {
    transport: Transport,
    tools: Option<ToolRegistry>,
    max_tool_rounds: u32,
    preview_len: usize,
}

impl Generator {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            tools: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }

    /// Build the transport and limits from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be constructed.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self::new(Transport::from_config(config)?)
            .with_max_tool_rounds(config.max_tool_rounds)
            .with_preview_len(config.preview_len))
    }

    /// Attach a tool registry; its definitions are sent with every request
    #[must_use]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    #[must_use]
    pub fn with_preview_len(mut self, len: usize) -> Self {
        self.preview_len = len;
        self
    }

    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    pub const fn tools(&self) -> Option<&ToolRegistry> {
        self.tools.as_ref()
    }

    /// Blocking call, running tool rounds until the model answers with text
    ///
    /// Usage is summed across rounds.
    ///
    /// # Errors
    ///
    /// Returns transport and provider errors, tool dispatch errors, and
    /// `LlmError::ToolRoundsExceeded` when the model keeps asking for tools.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<Completion, LlmError> {
        let mut request = self.prepare(request);
        let mut rounds = 0;
        let mut usage = None;

        loop {
            let mut completion = self.transport.complete(&request).await?;
            usage = sum_usage(usage, completion.usage);

            let Some(tools) = self.pending_tools(&completion.tool_calls) else {
                completion.usage = usage;
                return Ok(completion);
            };

            rounds += 1;
            self.check_rounds(rounds)?;
            request = Cow::Owned(follow_up(tools, &request, &completion.text, completion.tool_calls)?);
        }
    }

    /// Blocking call decoded into `T`
    ///
    /// # Errors
    ///
    /// Returns everything [`complete`](Self::complete) does, plus
    /// `LlmError::NoJsonObject` or `LlmError::DecodeFailed` when the text
    /// cannot be decoded.
    pub async fn generate<T: DeserializeOwned>(&self, request: &GenerationRequest) -> Result<T, LlmError> {
        let completion = self.complete(request).await?;
        decode(&completion.text, self.preview_len)
    }

    /// Build the request from a domain template, then [`generate`](Self::generate)
    ///
    /// # Errors
    ///
    /// See [`generate`](Self::generate).
    pub async fn generate_from<R: PromptTemplate>(
        &self,
        domain: &R,
        options: SamplingOptions,
    ) -> Result<R::Output, LlmError> {
        self.generate(&build(domain, options)).await
    }

    /// Streaming call decoded into `T`
    ///
    /// Fragments reach `sink` in provider order. Across tool rounds the sink
    /// still sees exactly one terminal fragment: `Done` once the final round
    /// finishes, or `Error` if a round fails.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Cancelled` or `LlmError::CallbackAborted` when the
    /// stream is stopped, and otherwise the same errors as
    /// [`generate`](Self::generate).
    pub async fn generate_stream<T: DeserializeOwned>(
        &self,
        request: &GenerationRequest,
        sink: &mut dyn FragmentSink,
        cancel: &CancellationToken,
    ) -> Result<T, LlmError> {
        let mut request = self.prepare(request);
        let mut rounds = 0;

        loop {
            let mut round = RoundSink::new(sink);
            self.transport.stream(&request, &mut round, cancel).await?;
            let completion = round.collector.into_completion();

            // Rounds end on a withheld `Done`, so the caller has not seen a terminal yet
            if cancel.is_cancelled() {
                tracing::debug!(rounds, "stream cancelled between rounds");
                return Err(LlmError::Cancelled);
            }

            let Some(tools) = self.pending_tools(&completion.tool_calls) else {
                deliver(sink, StreamFragment::Done).await?;
                return decode(&completion.text, self.preview_len);
            };

            rounds += 1;
            let next = self
                .check_rounds(rounds)
                .and_then(|()| follow_up(tools, &request, &completion.text, completion.tool_calls));

            match next {
                Ok(next) => request = Cow::Owned(next),
                Err(e) => {
                    if let Err(emit_err) = sink.emit(StreamFragment::Error(e.to_string())).await {
                        tracing::debug!(error = %emit_err, "sink rejected error fragment");
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Attach tool definitions when a registry is present
    fn prepare<'a>(&self, request: &'a GenerationRequest) -> Cow<'a, GenerationRequest> {
        let provider = self.transport.provider();
        if !provider.capabilities().tool_calling {
            if self.tools.as_ref().is_some_and(|tools| !tools.is_empty()) {
                tracing::debug!(provider = provider.name(), "provider cannot call tools, sending none");
            }
            return Cow::Borrowed(request);
        }

        match &self.tools {
            Some(tools) if request.tools.is_empty() && !tools.is_empty() => {
                Cow::Owned(request.clone().with_tools(tools.definitions()))
            }
            _ => Cow::Borrowed(request),
        }
    }

    /// The registry to dispatch with, if the model asked for tools and one is attached
    fn pending_tools(&self, calls: &[ToolCall]) -> Option<&ToolRegistry> {
        if calls.is_empty() {
            return None;
        }

        if self.tools.is_none() {
            tracing::debug!(calls = calls.len(), "model requested tools but no registry is attached");
        }

        self.tools.as_ref()
    }

    fn check_rounds(&self, rounds: u32) -> Result<(), LlmError> {
        if rounds > self.max_tool_rounds {
            return Err(LlmError::ToolRoundsExceeded(self.max_tool_rounds));
        }
        Ok(())
    }
}

/// Dispatch each call and build the next request with the results appended
fn follow_up(
    tools: &ToolRegistry,
    request: &GenerationRequest,
    text: &str,
    calls: Vec<ToolCall>,
) -> Result<GenerationRequest, LlmError> {
    let mut results = Vec::with_capacity(calls.len());

    for call in &calls {
        let output = tools.dispatch(&call.name, &call.arguments)?;
        results.push(Message::tool_result(call.id.clone(), output));
    }

    tracing::debug!(calls = calls.len(), "feeding tool results back to the model");

    Ok(request.continued(std::iter::once(Message::assistant_tool_calls(text, calls)).chain(results)))
}

fn sum_usage(total: Option<Usage>, round: Option<Usage>) -> Option<Usage> {
    match (total, round) {
        (Some(total), Some(round)) => Some(total.saturating_add(round)),
        (total, round) => total.or(round),
    }
}

/// Forwards one round to the caller, holding back `Done`
struct RoundSink<'a> {
    inner: &'a mut dyn FragmentSink,
    collector: Collector,
}

impl<'a> RoundSink<'a> {
    fn new(inner: &'a mut dyn FragmentSink) -> Self {
        Self {
            inner,
            collector: Collector::new(),
        }
    }
}

#[async_trait]
impl FragmentSink for RoundSink<'_> {
    async fn emit(&mut self, fragment: StreamFragment) -> anyhow::Result<()> {
        self.collector.absorb(&fragment);

        if fragment == StreamFragment::Done {
            return Ok(());
        }

        self.inner.emit(fragment).await
    }
}
