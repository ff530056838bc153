use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use url::Url;

/// LLM provider and generation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Wire protocol spoken by the provider
    #[serde(default)]
    pub provider: ProviderKind,
    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override; each provider has its own default
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Model identifier
    #[serde(default)]
    pub model: String,
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Ceiling for blocking calls, e.g. `"60s"` or `"2m"`
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    /// Maximum model/tool round trips per call
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Bytes of raw model output kept on decode errors
    #[serde(default = "default_preview_len")]
    pub preview_len: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: None,
            base_url: None,
            model: String::new(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout: default_timeout(),
            max_tool_rounds: default_max_tool_rounds(),
            preview_len: default_preview_len(),
        }
    }
}

/// Supported provider protocols
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions
    #[default]
    Openai,
    /// Single-completion `/api/generate` endpoints
    Completion,
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_max_tool_rounds() -> u32 {
    5
}

const fn default_preview_len() -> usize {
    512
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
}
