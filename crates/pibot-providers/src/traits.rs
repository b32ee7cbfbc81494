//! Model gateway trait — the calling contract between the orchestrator and
//! the LLM provider.
//!
//! One call takes the full turn sequence plus the tool schemas offered for
//! this turn and yields exactly one assistant turn: text content or tool calls.

use async_trait::async_trait;
use pibot_core::types::{LlmResponse, Message, ToolDefinition};

use crate::error::GatewayError;

/// Generation parameters sent with each call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    /// Model identifier (e.g. `"gpt-4o-mini"`).
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

/// Trait that all model backends implement.
///
/// Gateways are stateless per call: the orchestrator replays the whole
/// conversation, including earlier tool turns, every time.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send one chat completion request.
    ///
    /// # Arguments
    /// * `messages` — Conversation so far, system turn first.
    /// * `tools`    — Tool schemas the model may call this turn (may be empty).
    ///
    /// # Errors
    /// `GatewayError` on transport, auth, rate-limit, or decode failure.
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, GatewayError>;

    /// Model identifier used for calls.
    fn model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
