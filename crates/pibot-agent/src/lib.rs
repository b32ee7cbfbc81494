//! PiBot Agent — conversation orchestration and built-in tools.
//!
//! This crate contains:
//! - **tools**: Tool trait, registry, and built-in tools (time, web search, emotion)
//! - **conversation**: the turn sequence with its system-slot invariant
//! - **quota**: request counter and repeated-prompt cache
//! - **orchestrator**: the model ↔ tool-calling loop

pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod quota;
pub mod tools;

pub use conversation::{ConversationStore, ReplaceMode};
pub use error::{
    ConversationError, OrchestratorError, ToolInvokeError, ToolRegistryError, EMPTY_RESPONSE_TEXT,
};
pub use orchestrator::{ExecutedToolCall, Orchestrator, OrchestratorConfig, Reply};
pub use quota::{QuotaSnapshot, SessionQuota};
pub use tools::{build_registry, EmotionState, Tool, ToolRegistry};
