//! Structured generation pipeline for Quill
//!
//! Sends requests to an LLM provider (blocking or streamed), repairs the
//! near-JSON text models tend to produce, and decodes it into typed results.
//! Tool calls requested by the model are dispatched through a shared
//! [`ToolRegistry`] and fed back before decoding.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod decode;
pub mod error;
pub mod generator;
pub mod prompt;
pub mod protocol;
pub mod provider;
pub mod repair;
pub mod sink;
pub mod tools;
pub mod transport;
pub mod types;

pub use decode::decode;
pub use error::LlmError;
pub use generator::Generator;
pub use provider::{Provider, ProviderCapabilities};
pub use sink::{Collector, Completion, FragmentSink, sink_fn};
pub use tools::ToolRegistry;
pub use transport::{StreamSummary, Transport};
pub use types::{GenerationRequest, Message, SamplingOptions, StreamFragment};
