//! Consumers of stream fragments
//!
//! The transport awaits [`FragmentSink::emit`] for every fragment before
//! reading the next frame, so a slow sink applies backpressure to the
//! connection instead of growing a buffer.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::LlmError;
use crate::types::{StreamFragment, ToolCall, Usage};

/// Receiver of fragments for one call
///
/// Returning an error stops the stream; the call then fails with
/// `LlmError::CallbackAborted`.
#[async_trait]
pub trait FragmentSink: Send {
    async fn emit(&mut self, fragment: StreamFragment) -> anyhow::Result<()>;
}

/// Push one fragment, mapping a sink failure to `CallbackAborted`
pub(crate) async fn deliver(sink: &mut dyn FragmentSink, fragment: StreamFragment) -> Result<(), LlmError> {
    sink.emit(fragment)
        .await
        .map_err(|e| LlmError::CallbackAborted(e.to_string()))
}

/// Sink backed by a synchronous closure
pub struct FnSink<F>(F);

/// Wrap a closure as a [`FragmentSink`]
pub const fn sink_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(StreamFragment) -> anyhow::Result<()> + Send,
{
    FnSink(f)
}

#[async_trait]
impl<F> FragmentSink for FnSink<F>
where
    F: FnMut(StreamFragment) -> anyhow::Result<()> + Send,
{
    async fn emit(&mut self, fragment: StreamFragment) -> anyhow::Result<()> {
        (self.0)(fragment)
    }
}

/// Bounded channels block the transport when full; a dropped receiver aborts
#[async_trait]
impl FragmentSink for mpsc::Sender<StreamFragment> {
    async fn emit(&mut self, fragment: StreamFragment) -> anyhow::Result<()> {
        self.send(fragment)
            .await
            .map_err(|_| anyhow::anyhow!("fragment receiver dropped"))
    }
}

/// Everything a finished call produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Concatenated text deltas
    pub text: String,
    /// Tool calls requested by the model, in order
    pub tool_calls: Vec<ToolCall>,
    /// Last usage report, if the provider sent one
    pub usage: Option<Usage>,
    /// Last session metadata, if the provider sent any
    pub session: Option<serde_json::Value>,
}

/// Sink that folds fragments into a [`Completion`]
#[derive(Debug, Default)]
pub struct Collector {
    completion: Completion,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fragment
    pub fn absorb(&mut self, fragment: &StreamFragment) {
        match fragment {
            StreamFragment::TextDelta(text) => self.completion.text.push_str(text),
            StreamFragment::ToolCallRequest(call) => self.completion.tool_calls.push(call.clone()),
            StreamFragment::Usage(usage) => self.completion.usage = Some(*usage),
            StreamFragment::SessionInfo(info) => self.completion.session = Some(info.clone()),
            StreamFragment::Done | StreamFragment::Error(_) => {}
        }
    }

    pub fn into_completion(self) -> Completion {
        self.completion
    }
}

#[async_trait]
impl FragmentSink for Collector {
    async fn emit(&mut self, fragment: StreamFragment) -> anyhow::Result<()> {
        self.absorb(&fragment);
        Ok(())
    }
}
