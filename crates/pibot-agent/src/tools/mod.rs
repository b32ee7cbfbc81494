//! Tools the model can call, and the registry that dispatches them.

pub mod base;
pub mod builtin;
pub mod emotion;
pub mod registry;
pub mod time;
pub mod web;

pub use base::{optional_string, require_string, Tool};
pub use builtin::{build_registry, TOOL_GROUPS};
pub use emotion::{EmotionError, EmotionState, SetFaceEmotionTool};
pub use registry::ToolRegistry;
