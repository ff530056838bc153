//! Registry of tools the model may call
//!
//! A registry is constructed explicitly and shared by handle (`Clone` is a
//! reference-count bump). Dispatch reads and occasional registration writes
//! go through a concurrent map; the last registration for a name wins.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::error::LlmError;
use crate::types::FunctionDefinition;

/// Handler invoked with the raw arguments JSON
pub type ToolHandler = dyn Fn(&str) -> anyhow::Result<String> + Send + Sync;

/// A registered tool
struct ToolEntry {
    description: String,
    parameters: Value,
    handler: Box<ToolHandler>,
}

/// Tool registry shared across calls
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<DashMap<String, Arc<ToolEntry>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any existing tool with the same name
    pub fn register<F>(&self, name: impl Into<String>, description: impl Into<String>, parameters: Value, handler: F)
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        let name = name.into();
        let entry = Arc::new(ToolEntry {
            description: description.into(),
            parameters,
            handler: Box::new(handler),
        });

        if self.tools.insert(name.clone(), entry).is_some() {
            tracing::debug!(tool = %name, "replaced existing tool");
        } else {
            tracing::debug!(tool = %name, "registered tool");
        }
    }

    /// Remove a tool; unknown names are ignored
    pub fn unregister(&self, name: &str) {
        if self.tools.remove(name).is_some() {
            tracing::debug!(tool = %name, "unregistered tool");
        }
    }

    /// Snapshot of registered names, sorted
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|entry| entry.key().clone()).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions to attach to outgoing requests, sorted by name
    pub fn definitions(&self) -> Vec<FunctionDefinition> {
        let mut definitions: Vec<FunctionDefinition> = self
            .tools
            .iter()
            .map(|entry| FunctionDefinition {
                name: entry.key().clone(),
                description: (!entry.description.is_empty()).then(|| entry.description.clone()),
                parameters: Some(entry.parameters.clone()),
            })
            .collect();
        definitions.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Invoke the named tool with `arguments`
    ///
    /// The handler runs on the caller's task. Failures are logged and
    /// returned; they are not retried.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::UnknownTool` if nothing is registered under `name`
    /// and `LlmError::ToolFailed` if the handler fails.
    pub fn dispatch(&self, name: &str, arguments: &str) -> Result<String, LlmError> {
        // Clone the entry out so the map shard is not locked while the handler runs
        let Some(entry) = self.tools.get(name).map(|entry| Arc::clone(entry.value())) else {
            tracing::warn!(tool = %name, arguments = %arguments, "dispatch to unknown tool");
            return Err(LlmError::UnknownTool(name.to_owned()));
        };

        tracing::debug!(tool = %name, "invoking tool");

        (entry.handler)(arguments).map_err(|e| {
            tracing::warn!(tool = %name, arguments = %arguments, error = %e, "tool dispatch failed");
            LlmError::ToolFailed {
                name: name.to_owned(),
                message: e.to_string(),
            }
        })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.list_names()).finish()
    }
}
