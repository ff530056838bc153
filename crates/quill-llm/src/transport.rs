//! Blocking and streaming calls over a single provider code path
//!
//! Both modes run [`Provider::execute`]. The blocking call collects the
//! fragments under a fixed timeout; the streaming call forwards them to the
//! caller's sink and can be cancelled at any fragment boundary.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quill_config::LlmConfig;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::provider::{self, Provider};
use crate::sink::{Collector, Completion, FragmentSink, deliver};
use crate::types::{GenerationRequest, StreamFragment, Usage};

/// Default ceiling for blocking calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What a finished stream delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Last usage report, if the provider sent one
    pub usage: Option<Usage>,
    /// Fragments delivered to the sink, terminal included
    pub fragments: usize,
}

/// Sends requests to one provider
#[derive(Clone)]
pub struct Transport {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("provider", &self.provider.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Transport {
    pub fn new(provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Build the configured provider with the configured timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be constructed.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self::new(provider::from_config(config)?, config.timeout))
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send the request and wait for the whole response
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Transport` on network failure, non-2xx status, or
    /// when the call exceeds the configured timeout, and
    /// `LlmError::ProviderRefusal` when the provider reports an error.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<Completion, LlmError> {
        request.validate()?;
        self.log_start(request);

        let mut collector = Collector::new();
        let mut guard = GuardedSink::new(&mut collector, None);

        let outcome = match tokio::time::timeout(self.timeout, self.provider.execute(request, &mut guard)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(provider = self.provider.name(), timeout = ?self.timeout, "request timed out");
                Err(LlmError::Transport(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs_f64()
                )))
            }
        };

        self.settle(guard, outcome).await?;

        Ok(collector.into_completion())
    }

    /// Send the request with streaming enabled, pushing fragments into `sink`
    ///
    /// The sink sees fragments in provider order followed by exactly one
    /// `Done` or `Error`. Nothing is delivered after `cancel` fires or after
    /// the sink fails.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Cancelled` when `cancel` fires,
    /// `LlmError::CallbackAborted` when the sink fails, and the provider's
    /// error otherwise.
    pub async fn stream(
        &self,
        request: &GenerationRequest,
        sink: &mut dyn FragmentSink,
        cancel: &CancellationToken,
    ) -> Result<StreamSummary, LlmError> {
        request.validate()?;

        let request = if request.options.stream {
            Cow::Borrowed(request)
        } else {
            let mut owned = request.clone();
            owned.options.stream = true;
            Cow::Owned(owned)
        };
        self.log_start(&request);

        let mut guard = GuardedSink::new(sink, Some(cancel));

        // Dropping the provider future closes the connection
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(LlmError::Cancelled),
            result = self.provider.execute(&request, &mut guard) => result,
        };

        // A provider with fragments already buffered never yields to the
        // select above; the guard refuses them instead
        let outcome = match outcome {
            Err(_) if guard.cancelled => Err(LlmError::Cancelled),
            Ok(()) if cancel.is_cancelled() && !guard.terminated => Err(LlmError::Cancelled),
            other => other,
        };

        if matches!(outcome, Err(LlmError::Cancelled)) {
            tracing::debug!(provider = self.provider.name(), "stream cancelled by caller");
        }

        self.settle(guard, outcome).await
    }

    fn log_start(&self, request: &GenerationRequest) {
        tracing::debug!(
            provider = self.provider.name(),
            model = %request.options.model,
            stream = request.options.stream,
            messages = request.messages.len(),
            "sending request"
        );
    }

    /// Deliver the terminal fragment the provider did not, and report usage
    async fn settle(
        &self,
        mut guard: GuardedSink<'_>,
        outcome: Result<(), LlmError>,
    ) -> Result<StreamSummary, LlmError> {
        let provider = self.provider.name();

        if let Err(e) = outcome {
            match &e {
                // The consumer is gone or asked us to stop; it gets nothing more
                LlmError::CallbackAborted(_) | LlmError::Cancelled => {}
                _ if guard.terminated => {}
                other => {
                    let message = match other {
                        LlmError::ProviderRefusal(message) => message.clone(),
                        _ => other.to_string(),
                    };
                    if let Err(emit_err) = guard.emit(StreamFragment::Error(message)).await {
                        tracing::debug!(provider, error = %emit_err, "sink rejected error fragment");
                    }
                }
            }

            return Err(e);
        }

        if !guard.terminated {
            tracing::warn!(provider, "stream ended without a terminal frame, treating as done");
            if let Err(e) = deliver(&mut guard, StreamFragment::Done).await {
                return Err(if guard.cancelled { LlmError::Cancelled } else { e });
            }
        }

        let summary = guard.summary();

        if let Some(usage) = summary.usage {
            tracing::info!(
                provider,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "token usage"
            );
        }

        Ok(summary)
    }
}

/// Sink wrapper enforcing a single terminal fragment
///
/// Once `cancel` fires every further fragment is refused, so nothing reaches
/// the caller after cancellation even when the provider never yields.
struct GuardedSink<'a> {
    inner: &'a mut dyn FragmentSink,
    cancel: Option<&'a CancellationToken>,
    cancelled: bool,
    terminated: bool,
    delivered: usize,
    usage: Option<Usage>,
}

impl<'a> GuardedSink<'a> {
    fn new(inner: &'a mut dyn FragmentSink, cancel: Option<&'a CancellationToken>) -> Self {
        Self {
            inner,
            cancel,
            cancelled: false,
            terminated: false,
            delivered: 0,
            usage: None,
        }
    }

    const fn summary(&self) -> StreamSummary {
        StreamSummary {
            usage: self.usage,
            fragments: self.delivered,
        }
    }
}

#[async_trait]
impl FragmentSink for GuardedSink<'_> {
    async fn emit(&mut self, fragment: StreamFragment) -> anyhow::Result<()> {
        if self.terminated {
            tracing::debug!(?fragment, "dropping fragment after terminal");
            return Ok(());
        }

        if self.cancelled || self.cancel.is_some_and(CancellationToken::is_cancelled) {
            self.cancelled = true;
            anyhow::bail!("stream cancelled");
        }

        if let StreamFragment::Usage(usage) = &fragment {
            self.usage = Some(*usage);
        }

        let terminal = fragment.is_terminal();
        self.inner.emit(fragment).await?;
        self.delivered += 1;
        self.terminated = terminal;

        Ok(())
    }
}
