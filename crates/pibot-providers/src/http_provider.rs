//! HTTP model gateway for OpenAI-compatible `/chat/completions` APIs.
//!
//! Works against OpenAI itself and any compatible endpoint (vLLM, Ollama,
//! OpenRouter, …) by pointing `apiBase` at it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, error, warn};

use pibot_core::config::ProviderConfig;
use pibot_core::types::{
    ChatCompletionRequest, ChatCompletionResponse, LlmResponse, Message, ToolDefinition,
};

use crate::error::GatewayError;
use crate::traits::{LlmRequestConfig, ModelGateway};

/// Request timeout used when the caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ─────────────────────────────────────────────
// HttpGateway
// ─────────────────────────────────────────────

/// A model gateway that talks to an OpenAI-compatible HTTP API via `reqwest`.
pub struct HttpGateway {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
    /// Extra headers to send with each request.
    extra_headers: HeaderMap,
    /// Model, temperature, max_tokens.
    request_config: LlmRequestConfig,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("api_base", &self.api_base)
            .field("model", &self.request_config.model)
            .finish()
    }
}

impl HttpGateway {
    /// Create a gateway from the provider section of the config.
    ///
    /// `timeout` bounds every request end to end.
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, GatewayError> {
        let mut extra_headers = HeaderMap::new();
        if let Some(ref headers) = config.extra_headers {
            for (key, value) in headers {
                if let (Ok(name), Ok(val)) = (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    extra_headers.insert(name, val);
                } else {
                    warn!("Invalid header: {}={}", key, value);
                }
            }
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpGateway {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            extra_headers,
            request_config: LlmRequestConfig {
                model: config.model.clone(),
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl ModelGateway for HttpGateway {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, GatewayError> {
        debug!(
            model = %self.request_config.model,
            messages = messages.len(),
            tools = tools.len(),
            "Calling LLM"
        );

        let offered = (!tools.is_empty()).then(|| tools.to_vec());
        let request_body = ChatCompletionRequest {
            model: self.request_config.model.clone(),
            messages: messages.to_vec(),
            tool_choice: offered.as_ref().map(|_| "auto".to_string()),
            tools: offered,
            max_tokens: Some(self.request_config.max_tokens),
            temperature: Some(self.request_config.temperature),
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .headers(self.extra_headers.clone())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                GatewayError::transport(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(status = %status, body = %error_text, "API error");
            return Err(GatewayError::http(status.as_u16(), error_text));
        }

        let chat_resp = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "Failed to parse LLM response");
            GatewayError::transport(format!("invalid response body: {e}"))
        })?;

        let llm_resp: LlmResponse = chat_resp.into();
        debug!(
            has_content = llm_resp.content.is_some(),
            tool_calls = llm_resp.tool_calls.len(),
            finish_reason = llm_resp.finish_reason.as_deref().unwrap_or("?"),
            "LLM response received"
        );
        Ok(llm_resp)
    }

    fn model(&self) -> &str {
        &self.request_config.model
    }

    fn display_name(&self) -> &str {
        "OpenAI-compatible"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
