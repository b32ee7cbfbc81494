//! Tool Registry — tools keyed by name, with per-turn schema snapshots.
//!
//! The orchestrator asks for [`ToolRegistry::schema_snapshot`] before every
//! model call and dispatches tool-call requests by name.

use std::collections::HashMap;
use std::sync::Arc;

use pibot_core::types::ToolDefinition;
use serde_json::Value;
use tracing::{info, warn};

use super::base::Tool;
use crate::error::{ToolInvokeError, ToolRegistryError};

/// Longest tool name accepted by OpenAI-style function calling.
const MAX_TOOL_NAME_LEN: usize = 64;

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools keyed by name and dispatches calls.
///
/// Owns `Arc<dyn Tool>` so tools can be shared across threads.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Reject re-registration of an existing name instead of replacing.
    strict: bool,
}

impl ToolRegistry {
    /// Create an empty registry where the last registration of a name wins.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            strict: false,
        }
    }

    /// Create an empty registry that refuses duplicate names.
    pub fn strict() -> Self {
        Self {
            tools: HashMap::new(),
            strict: true,
        }
    }

    /// Register a tool after validating its name, description, and schema.
    ///
    /// Replaces a tool of the same name unless the registry is strict.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolRegistryError> {
        validate(tool.as_ref())?;

        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            if self.strict {
                return Err(ToolRegistryError::DuplicateTool(name));
            }
            info!(tool = %name, "replacing registered tool");
        } else {
            info!(tool = %name, "registered tool");
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Unregister a tool by name. Returns the removed tool, if any.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        let removed = self.tools.remove(name);
        if removed.is_some() {
            info!(tool = name, "unregistered tool");
        }
        removed
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolRegistryError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolRegistryError::NotFound(name.to_string()))
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools, sorted for determinism.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Freshly generated definitions for all registered tools, sorted by name.
    ///
    /// Never cached: each call re-reads every tool's `parameters()`.
    pub fn schema_snapshot(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    /// Execute a tool by name with the given parameters.
    pub async fn execute(
        &self,
        name: &str,
        params: HashMap<String, Value>,
    ) -> Result<String, ToolInvokeError> {
        let tool = self.tools.get(name).ok_or_else(|| {
            warn!(tool = name, "tool not found");
            ToolInvokeError::NotFound(name.to_string())
        })?;

        tool.execute(params).await.map_err(|e| {
            warn!(tool = name, error = %e, "tool execution failed");
            ToolInvokeError::Failed {
                name: name.to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fail fast on tools the model could never call correctly.
fn validate(tool: &dyn Tool) -> Result<(), ToolRegistryError> {
    let name = tool.name();
    let invalid = |reason: &str| ToolRegistryError::InvalidTool {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() || name.len() > MAX_TOOL_NAME_LEN {
        return Err(invalid("name must be 1-64 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid("name may only contain [A-Za-z0-9_-]"));
    }
    if tool.description().trim().is_empty() {
        return Err(invalid("description is empty"));
    }

    let schema = tool.parameters();
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Err(invalid("parameters must be a JSON Schema with \"type\": \"object\""));
    }
    if let Some(props) = schema.get("properties") {
        if !props.is_object() {
            return Err(invalid("\"properties\" must be an object"));
        }
    }
    Ok(())
}
