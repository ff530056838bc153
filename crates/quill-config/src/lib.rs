#![allow(clippy::must_use_candidate)]

mod env;
pub mod llm;
mod loader;
pub mod log;

use serde::Deserialize;

pub use llm::*;
pub use log::*;

/// Top-level Quill configuration
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// LLM provider and generation settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Log output settings
    #[serde(default)]
    pub log: LogConfig,
}
