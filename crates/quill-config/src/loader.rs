use std::path::Path;

use crate::Config;

/// Inclusive temperature bounds accepted by providers
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// expanded, the TOML is malformed, or validation fails.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let config = Self::parse(&raw)?;
        tracing::debug!(path = %path.display(), provider = ?config.llm.provider, "configuration loaded");

        Ok(config)
    }

    /// Expand placeholders, parse, and validate config text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded = crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Check values serde cannot
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        let llm = &self.llm;

        if llm.model.trim().is_empty() {
            anyhow::bail!("llm.model must be set");
        }

        if !TEMPERATURE_RANGE.contains(&llm.temperature) {
            anyhow::bail!("llm.temperature must be between 0 and 2, got {}", llm.temperature);
        }

        if llm.max_tokens == Some(0) {
            anyhow::bail!("llm.max_tokens must be greater than 0");
        }

        if llm.timeout.is_zero() {
            anyhow::bail!("llm.timeout must be greater than 0");
        }

        if llm.max_tool_rounds == 0 {
            anyhow::bail!("llm.max_tool_rounds must be greater than 0");
        }

        Ok(())
    }
}
