//! Built-in tool groups and the static registration list.

use std::sync::Arc;

use pibot_core::config::ToolsConfig;
use tracing::debug;

use super::emotion::{EmotionState, SetFaceEmotionTool};
use super::registry::ToolRegistry;
use super::time::{GetCurrentDateTool, GetCurrentTimeTool};
use super::web::WebSearchTool;
use crate::error::ToolRegistryError;

/// Group names accepted in `tools.enabled`.
pub const TOOL_GROUPS: &[&str] = &["time", "web_search", "emotion"];

/// Build a registry holding every enabled tool group.
///
/// Unknown group names are a configuration error. The emotion tool shares
/// `emotions` with the caller, so admin updates reach its schema.
pub fn build_registry(
    config: &ToolsConfig,
    strict: bool,
    emotions: Arc<EmotionState>,
) -> Result<ToolRegistry, ToolRegistryError> {
    let mut registry = if strict {
        ToolRegistry::strict()
    } else {
        ToolRegistry::new()
    };

    for group in &config.enabled {
        debug!(group = %group, "registering tool group");
        match group.as_str() {
            "time" => {
                registry.register(Arc::new(GetCurrentTimeTool::new(&config.default_timezone)))?;
                registry.register(Arc::new(GetCurrentDateTool::new(&config.default_timezone)))?;
            }
            "web_search" => {
                registry.register(Arc::new(WebSearchTool::new(
                    &config.web_search.api_key,
                    config.web_search.max_results,
                )))?;
            }
            "emotion" => {
                registry.register(Arc::new(SetFaceEmotionTool::new(emotions.clone())))?;
            }
            other => return Err(ToolRegistryError::UnknownToolGroup(other.to_string())),
        }
    }

    Ok(registry)
}
