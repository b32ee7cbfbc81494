//! Error types for the orchestrator and its components.
//!
//! Only [`OrchestratorError`] reaches callers of `respond`. Tool-level
//! failures ([`ToolInvokeError`]) are turned into tool turns the model reads.

use pibot_providers::GatewayError;
use thiserror::Error;

/// Fixed answer text used when the model returns neither content nor tool calls.
pub const EMPTY_RESPONSE_TEXT: &str = "Sorry, I could not come up with an answer.";

/// Loop-level failures of a single `respond` call.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The session has used up its request allowance.
    #[error("request quota exhausted ({limit} requests)")]
    QuotaExceeded { limit: u64 },

    /// The model gateway failed or timed out; retrying the prompt may help.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The model kept requesting tools without converging on an answer.
    #[error("no final answer after {turns} model turns")]
    TurnBudgetExceeded { turns: u32 },

    /// The model returned a turn with neither content nor tool calls.
    ///
    /// `respond` answers such turns with [`EMPTY_RESPONSE_TEXT`] instead of
    /// failing; the variant names the condition for callers that map outcomes.
    #[error("{}", EMPTY_RESPONSE_TEXT)]
    EmptyResponse,
}

/// Conversation store invariant and validation failures.
#[derive(Debug, Error, PartialEq)]
pub enum ConversationError {
    #[error("conversation has no system turn in slot 0")]
    InvariantViolation,

    #[error("invalid history entry at index {index}: {reason}")]
    InvalidHistoryEntry { index: usize, reason: String },
}

/// Registration and lookup failures of the tool registry.
#[derive(Debug, Error, PartialEq)]
pub enum ToolRegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("tool '{name}' is invalid: {reason}")]
    InvalidTool { name: String, reason: String },

    #[error("tool '{0}' not found")]
    NotFound(String),

    #[error("unknown tool group '{0}' (expected one of: time, web_search, emotion)")]
    UnknownToolGroup(String),
}

/// A single tool call that could not produce a result.
///
/// The `Display` text is exactly what the model sees in the tool turn.
#[derive(Debug, Error, PartialEq)]
pub enum ToolInvokeError {
    #[error("Error: Tool '{0}' not found")]
    NotFound(String),

    #[error("Error executing {name}: {message}")]
    Failed { name: String, message: String },
}
