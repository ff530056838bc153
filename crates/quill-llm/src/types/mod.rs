//! Provider-agnostic request and stream types
//!
//! Every wire format converts to and from these.

pub mod message;
pub mod request;
pub mod stream;
pub mod tool;

pub use message::{Message, Role, ToolCall};
pub use request::{GenerationRequest, SamplingOptions, TEMPERATURE_RANGE};
pub use stream::{StreamFragment, Usage};
pub use tool::FunctionDefinition;
