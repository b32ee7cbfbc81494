//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentConfig`, `ProviderConfig`, `ToolsConfig`,
//! `ServerConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.pibot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentConfig,
    pub provider: ProviderConfig,
    pub tools: ToolsConfig,
    pub server: ServerConfig,
}

// ─────────────────────────────────────────────
// Agent (orchestrator)
// ─────────────────────────────────────────────

/// Orchestrator settings: persona, budgets, and strictness switches.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// System instruction installed at startup.
    pub system_message: String,
    /// Maximum model turns per prompt before giving up.
    pub max_turns: u32,
    /// Successful prompts allowed per session.
    pub max_requests: u64,
    /// Upper bound for a single model gateway call.
    pub gateway_timeout_secs: u64,
    /// Reject a whole history import on the first invalid entry.
    pub strict_history_replace: bool,
    /// Refuse to register a tool whose name is already taken.
    pub strict_tool_registration: bool,
    /// Tools whose calls are reported back to the caller.
    pub observed_tools: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_message: "You are PiBot, a friendly and helpful robot.".to_string(),
            max_turns: 5,
            max_requests: 500,
            gateway_timeout_secs: 60,
            strict_history_replace: false,
            strict_tool_registration: false,
            observed_tools: vec!["set_face_emotion".to_string()],
        }
    }
}

// ─────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────

/// Connection settings for the OpenAI-compatible model endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for bearer authentication.
    pub api_key: String,
    /// API base URL; `/chat/completions` is appended.
    pub api_base: String,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            extra_headers: None,
        }
    }
}

impl ProviderConfig {
    /// Whether an API key is configured.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

/// Which built-in tool groups to register, plus their settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    /// Tool groups: `"time"`, `"web_search"`, `"emotion"`.
    pub enabled: Vec<String>,
    /// IANA time zone used when the model omits one.
    pub default_timezone: String,
    pub web_search: WebSearchConfig,
    /// Initial allowed emotion labels.
    pub emotions: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: vec![
                "time".to_string(),
                "web_search".to_string(),
                "emotion".to_string(),
            ],
            default_timezone: "Europe/Berlin".to_string(),
            web_search: WebSearchConfig::default(),
            emotions: ["happy", "sad", "angry", "neutral"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Web search tool config (Brave Search API).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebSearchConfig {
    pub api_key: String,
    pub max_results: u32,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            max_results: 3,
        }
    }
}

// ─────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────

/// HTTP API bind address.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.max_turns, 5);
        assert_eq!(config.agent.max_requests, 500);
        assert_eq!(config.agent.observed_tools, vec!["set_face_emotion"]);
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert!(!config.provider.is_configured());
        assert_eq!(config.tools.emotions.len(), 4);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "agent": { "maxTurns": 3 }, "tools": { "webSearch": { "apiKey": "brave" } } }"#,
        )
        .unwrap();

        assert_eq!(config.agent.max_turns, 3);
        assert_eq!(config.agent.max_requests, 500);
        assert_eq!(config.tools.web_search.api_key, "brave");
        assert_eq!(config.tools.web_search.max_results, 3);
        assert_eq!(config.tools.default_timezone, "Europe/Berlin");
    }

    #[test]
    fn test_serializes_camel_case() {
        let raw = serde_json::to_value(Config::default()).unwrap();
        assert!(raw["agent"].get("systemMessage").is_some());
        assert!(raw["agent"].get("system_message").is_none());
        assert!(raw["provider"].get("extraHeaders").is_none());
    }
}
