//! Web search tool — top results from the Brave Search API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::base::{require_string, Tool};

/// Brave web search endpoint.
pub const BRAVE_SEARCH_URL: &str = "https://api.search.brave.com/res/v1/web/search";

/// Results returned when the config does not say otherwise.
pub const DEFAULT_MAX_RESULTS: u32 = 3;

const USER_AGENT: &str = concat!("pibot/", env!("CARGO_PKG_VERSION"));

// ─────────────────────────────────────────────
// WebSearchTool
// ─────────────────────────────────────────────

/// Searches the web and returns the top hits as a short text digest.
pub struct WebSearchTool {
    api_key: Option<String>,
    endpoint: String,
    max_results: u32,
    client: Client,
}

impl WebSearchTool {
    /// Create a new web search tool.
    ///
    /// An empty `api_key` falls back to the `BRAVE_API_KEY` env var at call time.
    pub fn new(api_key: impl Into<String>, max_results: u32) -> Self {
        let api_key = api_key.into();
        Self {
            api_key: (!api_key.is_empty()).then_some(api_key),
            endpoint: BRAVE_SEARCH_URL.to_string(),
            max_results: max_results.clamp(1, 20),
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Point the tool at a different search endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("BRAVE_API_KEY").ok())
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "perform_web_search"
    }

    fn description(&self) -> &str {
        "Use this tool when you need current information beyond your training data \
         (e.g. news, weather, recent events)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query, e.g. 'weather Berlin today'"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let query = require_string(&params, "query")?;
        let api_key = self
            .resolve_api_key()
            .ok_or_else(|| anyhow::anyhow!("No search API key configured (set BRAVE_API_KEY)"))?;

        let count = self.max_results.to_string();
        debug!(query = %query, count = self.max_results, "searching web");

        let resp = self
            .client
            .get(&self.endpoint)
            .header("X-Subscription-Token", &api_key)
            .header("Accept", "application/json")
            .query(&[("q", query.as_str()), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Search request failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Search API returned {status}: {body}");
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse search response: {e}"))?;

        Ok(format_results(&body, self.max_results as usize))
    }
}

/// Render `web.results[]` as `- title: snippet\n  (Source: url)` blocks.
fn format_results(body: &Value, limit: usize) -> String {
    let results = body["web"]["results"].as_array().cloned().unwrap_or_default();
    if results.is_empty() {
        return "The web search returned no results.".into();
    }

    results
        .iter()
        .take(limit)
        .map(|r| {
            let title = r["title"].as_str().unwrap_or("Untitled");
            let desc = r["description"].as_str().unwrap_or("No preview available.");
            let url = r["url"].as_str().unwrap_or("");
            format!("- {title}: {desc}\n  (Source: {url})")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query(q: &str) -> HashMap<String, Value> {
        let mut params = HashMap::new();
        params.insert("query".into(), json!(q));
        params
    }

    #[test]
    fn test_format_results_limits_and_formats() {
        let body = json!({"web": {"results": [
            {"title": "A", "url": "https://a.example", "description": "first"},
            {"title": "B", "url": "https://b.example"},
            {"title": "C", "url": "https://c.example", "description": "third"}
        ]}});
        let out = format_results(&body, 2);
        assert_eq!(
            out,
            "- A: first\n  (Source: https://a.example)\n\n- B: No preview available.\n  (Source: https://b.example)"
        );
    }

    #[test]
    fn test_format_results_empty() {
        assert_eq!(format_results(&json!({}), 3), "The web search returned no results.");
    }

    #[tokio::test]
    async fn test_search_against_mock_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("X-Subscription-Token", "brave-key"))
            .and(query_param("q", "pibot"))
            .and(query_param("count", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "web": {"results": [
                    {"title": "PiBot", "url": "https://pibot.example", "description": "A robot"}
                ]}
            })))
            .mount(&server)
            .await;

        let tool = WebSearchTool::new("brave-key", DEFAULT_MAX_RESULTS).with_endpoint(server.uri());
        let out = tool.execute(query("pibot")).await.unwrap();
        assert_eq!(out, "- PiBot: A robot\n  (Source: https://pibot.example)");
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let tool = WebSearchTool::new("wrong", 3).with_endpoint(server.uri());
        let err = tool.execute(query("anything")).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_missing_query_param() {
        let tool = WebSearchTool::new("key", 3);
        let err = tool.execute(HashMap::new()).await.unwrap_err();
        assert!(err.to_string().contains("query"));
    }
}
