//! Orchestrator — the model ↔ tool-calling loop behind every prompt.
//!
//! One session lock covers the conversation and the quota for the whole of
//! `respond`, including gateway calls and tool execution. The loop works on
//! a copy of the turn sequence and only commits it once a final answer
//! exists, so a failed prompt leaves no trace in the conversation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use pibot_core::config::AgentConfig;
use pibot_core::types::{HistoryEntry, LlmResponse, Message, ToolCall, ToolDefinition};
use pibot_providers::{GatewayError, ModelGateway};

use crate::conversation::{ConversationStore, ReplaceMode};
use crate::error::{ConversationError, OrchestratorError, ToolInvokeError, EMPTY_RESPONSE_TEXT};
use crate::quota::{QuotaSnapshot, SessionQuota};
use crate::tools::ToolRegistry;

/// Model turns allowed per prompt.
pub const MAX_TURNS: u32 = 5;

/// Completed requests allowed per session.
pub const MAX_REQUESTS: u64 = 500;

// ─────────────────────────────────────────────
// Config & results
// ─────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub max_turns: u32,
    pub max_requests: u64,
    /// Upper bound for a single gateway call.
    pub gateway_timeout: Duration,
    pub replace_mode: ReplaceMode,
    /// Tools whose successful calls are reported back in [`Reply::executed_tools`].
    pub observed_tools: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_turns: MAX_TURNS,
            max_requests: MAX_REQUESTS,
            gateway_timeout: Duration::from_secs(60),
            replace_mode: ReplaceMode::Lenient,
            observed_tools: vec!["set_face_emotion".into()],
        }
    }
}

/// Zero turns or a zero timeout would fail every prompt, so both are raised to 1.
impl From<&AgentConfig> for OrchestratorConfig {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_turns: config.max_turns.max(1),
            max_requests: config.max_requests,
            gateway_timeout: Duration::from_secs(config.gateway_timeout_secs.max(1)),
            replace_mode: ReplaceMode::from_strict(config.strict_history_replace),
            observed_tools: config.observed_tools.clone(),
        }
    }
}

/// A side-effecting tool call made while answering a prompt.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExecutedToolCall {
    pub name: String,
    #[serde(rename = "args")]
    pub arguments: Value,
}

/// Final answer of one `respond` call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    pub executed_tools: Vec<ExecutedToolCall>,
}

struct Session {
    store: ConversationStore,
    quota: SessionQuota,
}

// ─────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────

pub struct Orchestrator {
    gateway: Arc<dyn ModelGateway>,
    tools: RwLock<Arc<ToolRegistry>>,
    session: Mutex<Session>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        tools: ToolRegistry,
        system_instruction: impl Into<String>,
        config: OrchestratorConfig,
    ) -> Self {
        info!(
            model = %gateway.model(),
            tools = tools.len(),
            max_turns = config.max_turns,
            max_requests = config.max_requests,
            "orchestrator initialized"
        );

        Self {
            gateway,
            tools: RwLock::new(Arc::new(tools)),
            session: Mutex::new(Session {
                store: ConversationStore::new(system_instruction),
                quota: SessionQuota::new(),
            }),
            config,
        }
    }

    /// Answer `prompt`, running tools as the model requests them.
    ///
    /// Concurrent callers queue on the session lock and are served one at a
    /// time. On any error the conversation and quota are left as they were.
    pub async fn respond(&self, prompt: &str) -> Result<Reply, OrchestratorError> {
        let mut session = self.session.lock().await;

        if !session.quota.check(self.config.max_requests) {
            warn!(limit = self.config.max_requests, "request quota exhausted");
            return Err(OrchestratorError::QuotaExceeded {
                limit: self.config.max_requests,
            });
        }

        if let Some(cached) = session.quota.cached(prompt) {
            debug!("repeated prompt, returning cached response");
            return Ok(Reply {
                text: cached.to_string(),
                executed_tools: Vec::new(),
            });
        }

        let mut turns = session.store.turns().to_vec();
        turns.push(Message::user(prompt));

        let reply = self.run_loop(&mut turns).await?;

        session.store.commit(turns);
        session.quota.record(prompt, &reply.text);
        info!(
            requests = session.quota.request_count(),
            executed_tools = reply.executed_tools.len(),
            "prompt answered"
        );
        Ok(reply)
    }

    /// Alternate gateway calls and tool execution on the working copy.
    async fn run_loop(&self, turns: &mut Vec<Message>) -> Result<Reply, OrchestratorError> {
        let mut executed_tools = Vec::new();

        for turn in 1..=self.config.max_turns {
            // Re-read on every turn: reloads and schema changes apply immediately
            let registry = self.tools.read().await.clone();
            let schemas = registry.schema_snapshot();

            info!(turn, tools = schemas.len(), "calling model");
            let response = self.call_gateway(turns, &schemas).await?;

            if !response.has_content() && !response.has_tool_calls() {
                warn!(turn, "model returned neither content nor tool calls");
                turns.push(Message::assistant(EMPTY_RESPONSE_TEXT));
                return Ok(Reply {
                    text: EMPTY_RESPONSE_TEXT.to_string(),
                    executed_tools,
                });
            }

            turns.push(response.to_message());
            if response.has_content() {
                return Ok(Reply {
                    text: response.content.unwrap_or_default(),
                    executed_tools,
                });
            }

            for call in &response.tool_calls {
                let name = &call.function.name;
                info!(tool = %name, turn, "executing tool call");

                let content = match invoke(&registry, call).await {
                    Ok((output, arguments)) => {
                        if self.config.observed_tools.iter().any(|t| t == name) {
                            executed_tools.push(ExecutedToolCall {
                                name: name.clone(),
                                arguments: Value::Object(arguments),
                            });
                        }
                        debug!(tool = %name, result_len = output.len(), "tool result");
                        output
                    }
                    Err(e) => {
                        warn!(tool = %name, error = %e, "tool call failed, reporting to model");
                        e.to_string()
                    }
                };
                turns.push(Message::tool_result(&call.id, name, content));
            }
        }

        warn!(turns = self.config.max_turns, "turn budget exhausted");
        Err(OrchestratorError::TurnBudgetExceeded {
            turns: self.config.max_turns,
        })
    }

    async fn call_gateway(
        &self,
        turns: &[Message],
        schemas: &[ToolDefinition],
    ) -> Result<LlmResponse, GatewayError> {
        let timeout = self.config.gateway_timeout;
        match tokio::time::timeout(timeout, self.gateway.chat(turns, schemas)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                error!(error = %e, "model gateway failed");
                Err(e)
            }
            Err(_) => {
                error!(timeout_secs = timeout.as_secs_f64(), "model gateway timed out");
                Err(GatewayError::transport(format!(
                    "no response within {:.1}s",
                    timeout.as_secs_f64()
                )))
            }
        }
    }

    // ─────────────────────────────────────────
    // Administrative operations
    // ─────────────────────────────────────────

    /// Replace the system instruction; all other turns are dropped.
    pub async fn set_system_instruction(&self, text: impl Into<String>) {
        let mut session = self.session.lock().await;
        session.store.set_system_instruction(text);
        session.quota.clear_cache();
        info!("system instruction replaced, history reset");
    }

    pub async fn system_instruction(&self) -> String {
        let session = self.session.lock().await;
        session.store.system_instruction().unwrap_or_default().to_string()
    }

    pub async fn clear_history(&self) {
        let mut session = self.session.lock().await;
        session.store.clear();
        session.quota.clear_cache();
        info!("conversation history cleared");
    }

    /// Conversation turns without the system instruction.
    pub async fn history(&self) -> Vec<Message> {
        self.session.lock().await.store.history()
    }

    /// Replace the history with user/assistant entries.
    ///
    /// Returns how many entries were kept.
    pub async fn replace_history(&self, entries: &[HistoryEntry]) -> Result<usize, ConversationError> {
        let mut session = self.session.lock().await;
        let admitted = session.store.replace(entries, self.config.replace_mode)?;
        session.quota.clear_cache();
        info!(admitted, offered = entries.len(), "history replaced");
        Ok(admitted)
    }

    /// Zero the request counter and forget the cached prompt.
    pub async fn reset_quota(&self) {
        self.session.lock().await.quota.reset();
        info!("request quota reset");
    }

    pub async fn quota(&self) -> QuotaSnapshot {
        self.session
            .lock()
            .await
            .quota
            .snapshot(self.config.max_requests)
    }

    /// Swap in a new tool registry. A running prompt sees it on its next turn.
    pub async fn reload_tools(&self, tools: ToolRegistry) {
        let count = tools.len();
        *self.tools.write().await = Arc::new(tools);
        info!(tools = count, "tool registry reloaded");
    }

    pub async fn tool_names(&self) -> Vec<String> {
        self.tools.read().await.tool_names()
    }

    pub fn model(&self) -> &str {
        self.gateway.model()
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.display_name()
    }
}

/// Decode the call's arguments and run the tool.
///
/// Returns the output together with the decoded arguments.
async fn invoke(
    registry: &ToolRegistry,
    call: &ToolCall,
) -> Result<(String, Map<String, Value>), ToolInvokeError> {
    let name = &call.function.name;
    if !registry.has(name) {
        return Err(ToolInvokeError::NotFound(name.clone()));
    }

    let arguments = parse_arguments(&call.function.arguments).map_err(|message| {
        ToolInvokeError::Failed {
            name: name.clone(),
            message,
        }
    })?;
    let params: HashMap<String, Value> = arguments.clone().into_iter().collect();
    let output = registry.execute(name, params).await?;
    Ok((output, arguments))
}

/// Arguments arrive as a JSON-encoded object; blank means no arguments.
fn parse_arguments(raw: &str) -> Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("arguments must be a JSON object, got: {other}")),
        Err(e) => Err(format!("invalid JSON arguments: {e}")),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pibot_core::types::Role;
    use serde_json::json;

    use crate::tools::{EmotionState, SetFaceEmotionTool, Tool};

    /// A gateway that plays back a script and records what it was shown.
    struct ScriptedGateway {
        script: std::sync::Mutex<VecDeque<Result<LlmResponse, GatewayError>>>,
        /// Returned once the script runs dry.
        fallback: Option<LlmResponse>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        seen_tools: std::sync::Mutex<Vec<Vec<ToolDefinition>>>,
    }

    impl ScriptedGateway {
        fn new(script: Vec<Result<LlmResponse, GatewayError>>) -> Self {
            Self {
                script: std::sync::Mutex::new(script.into()),
                fallback: None,
                delay: None,
                calls: AtomicUsize::new(0),
                seen_tools: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn replies(responses: Vec<LlmResponse>) -> Self {
            Self::new(responses.into_iter().map(Ok).collect())
        }

        fn always(response: LlmResponse) -> Self {
            Self {
                fallback: Some(response),
                ..Self::new(Vec::new())
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn seen_enum(&self, call: usize) -> Value {
            let seen = self.seen_tools.lock().unwrap();
            let def = seen[call]
                .iter()
                .find(|d| d.function.name == "set_face_emotion")
                .unwrap();
            def.function.parameters["properties"]["emotion"]["enum"].clone()
        }
    }

    #[async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn chat(
            &self,
            _messages: &[Message],
            tools: &[ToolDefinition],
        ) -> Result<LlmResponse, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_tools.lock().unwrap().push(tools.to_vec());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(r) => r,
                None => Ok(self
                    .fallback
                    .clone()
                    .unwrap_or_else(|| LlmResponse::text("(script exhausted)"))),
            }
        }

        fn model(&self) -> &str {
            "scripted"
        }

        fn display_name(&self) -> &str {
            "ScriptedGateway"
        }
    }

    /// Tool that always fails.
    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _params: HashMap<String, Value>) -> anyhow::Result<String> {
            anyhow::bail!("sensor offline")
        }
    }

    fn call(id: &str, name: &str, args: Value) -> ToolCall {
        ToolCall::new(id, name, args.to_string())
    }

    fn emotion_registry(state: &Arc<EmotionState>) -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(SetFaceEmotionTool::new(state.clone()))).unwrap();
        reg.register(Arc::new(BrokenTool)).unwrap();
        reg
    }

    fn orchestrator(gateway: Arc<ScriptedGateway>, tools: ToolRegistry) -> Orchestrator {
        Orchestrator::new(gateway, tools, "You are PiBot.", OrchestratorConfig::default())
    }

    #[tokio::test]
    async fn test_plain_answer_without_tools() {
        let gateway = Arc::new(ScriptedGateway::replies(vec![LlmResponse::text("15")]));
        let orch = orchestrator(gateway.clone(), ToolRegistry::new());

        let reply = orch.respond("What is 10+5?").await.unwrap();
        assert_eq!(
            reply,
            Reply {
                text: "15".into(),
                executed_tools: vec![]
            }
        );
        assert_eq!(
            orch.history().await,
            vec![Message::user("What is 10+5?"), Message::assistant("15")]
        );
        assert!(gateway.seen_tools.lock().unwrap()[0].is_empty());
        assert_eq!(orch.quota().await.request_count, 1);
    }

    #[tokio::test]
    async fn test_tool_round_commits_all_turns_and_reports_observed_tool() {
        let state = EmotionState::new(["happy", "sad"]);
        let gateway = Arc::new(ScriptedGateway::replies(vec![
            LlmResponse::tool_calls(vec![call("call_1", "set_face_emotion", json!({"emotion": "happy"}))]),
            LlmResponse::text("Yay!"),
        ]));
        let orch = orchestrator(gateway.clone(), emotion_registry(&state));

        let reply = orch.respond("Smile!").await.unwrap();
        assert_eq!(reply.text, "Yay!");
        assert_eq!(
            reply.executed_tools,
            vec![ExecutedToolCall {
                name: "set_face_emotion".into(),
                arguments: json!({"emotion": "happy"}),
            }]
        );
        assert_eq!(state.last(), "happy");

        // system + user + assistant(tool_calls) + tool + assistant
        let history = orch.history().await;
        assert_eq!(history.len(), 4);
        let roles: Vec<Role> = history.iter().map(Message::role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        match &history[2] {
            Message::Tool {
                tool_call_id,
                content,
                ..
            } => {
                assert_eq!(tool_call_id, "call_1");
                assert_eq!(content, "Emotion 'happy' set successfully.");
            }
            other => panic!("expected tool turn, got {other:?}"),
        }
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_multiple_calls_in_one_round_run_in_order() {
        let state = EmotionState::new(["happy", "sad"]);
        let gateway = Arc::new(ScriptedGateway::replies(vec![
            LlmResponse::tool_calls(vec![
                call("call_a", "set_face_emotion", json!({"emotion": "sad"})),
                call("call_b", "set_face_emotion", json!({"emotion": "happy"})),
            ]),
            LlmResponse::text("done"),
        ]));
        let orch = orchestrator(gateway, emotion_registry(&state));

        let reply = orch.respond("Be moody").await.unwrap();
        assert_eq!(reply.executed_tools.len(), 2);
        assert_eq!(state.last(), "happy");
        // 2 + one assistant tool-call turn + two tool turns
        assert_eq!(orch.history().await.len(), 5);
    }

    #[tokio::test]
    async fn test_repeated_prompt_served_from_cache() {
        let gateway = Arc::new(ScriptedGateway::replies(vec![
            LlmResponse::text("first"),
            LlmResponse::text("second"),
        ]));
        let orch = orchestrator(gateway.clone(), ToolRegistry::new());

        let a = orch.respond("Hello").await.unwrap();
        let before = orch.history().await;
        let b = orch.respond("Hello").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(orch.history().await, before);
        assert_eq!(gateway.calls(), 1);
        assert_eq!(orch.quota().await.request_count, 1);
    }

    #[tokio::test]
    async fn test_set_system_instruction_resets_history_and_cache() {
        let gateway = Arc::new(ScriptedGateway::replies(vec![
            LlmResponse::text("first"),
            LlmResponse::text("second"),
        ]));
        let orch = orchestrator(gateway.clone(), ToolRegistry::new());

        orch.respond("Hello").await.unwrap();
        orch.set_system_instruction("You are a pirate.").await;
        assert!(orch.history().await.is_empty());
        assert_eq!(orch.system_instruction().await, "You are a pirate.");

        let reply = orch.respond("Hello").await.unwrap();
        assert_eq!(reply.text, "second");
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let gateway = Arc::new(ScriptedGateway::replies(vec![LlmResponse::text("hi")]));
        let orch = orchestrator(gateway, ToolRegistry::new());
        orch.respond("Hello").await.unwrap();

        orch.clear_history().await;
        assert!(orch.history().await.is_empty());
        assert_eq!(orch.system_instruction().await, "You are PiBot.");
    }

    #[tokio::test]
    async fn test_replace_history_lenient_and_strict() {
        let entries = vec![
            HistoryEntry::new("user", "Hi"),
            HistoryEntry::new("robot", "beep"),
            HistoryEntry::new("assistant", "Hello!"),
        ];

        let lenient = orchestrator(Arc::new(ScriptedGateway::replies(vec![])), ToolRegistry::new());
        assert_eq!(lenient.replace_history(&entries).await.unwrap(), 2);
        assert_eq!(lenient.history().await.len(), 2);

        let strict = Orchestrator::new(
            Arc::new(ScriptedGateway::replies(vec![])),
            ToolRegistry::new(),
            "sys",
            OrchestratorConfig {
                replace_mode: ReplaceMode::Strict,
                ..Default::default()
            },
        );
        let err = strict.replace_history(&entries).await.unwrap_err();
        assert!(matches!(err, ConversationError::InvalidHistoryEntry { index: 1, .. }));
        assert!(strict.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_turn_budget_exhausted_rolls_back() {
        let state = EmotionState::new(["happy"]);
        let gateway = Arc::new(ScriptedGateway::always(LlmResponse::tool_calls(vec![call(
            "call_loop",
            "set_face_emotion",
            json!({"emotion": "happy"}),
        )])));
        let orch = orchestrator(gateway.clone(), emotion_registry(&state));

        let err = orch.respond("loop forever").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::TurnBudgetExceeded { turns: 5 }));
        assert_eq!(gateway.calls(), 5);
        assert!(orch.history().await.is_empty());
        assert_eq!(orch.quota().await.request_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let gateway = Arc::new(ScriptedGateway::replies(vec![
            LlmResponse::tool_calls(vec![call("call_x", "launch_rocket", json!({}))]),
            LlmResponse::text("I can't do that."),
        ]));
        let orch = orchestrator(gateway.clone(), ToolRegistry::new());

        let reply = orch.respond("Launch!").await.unwrap();
        assert_eq!(reply.text, "I can't do that.");
        assert!(reply.executed_tools.is_empty());

        let history = orch.history().await;
        assert_eq!(history[2].text(), Some("Error: Tool 'launch_rocket' not found"));
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_tool_failures_are_absorbed() {
        let state = EmotionState::new(["happy"]);
        let gateway = Arc::new(ScriptedGateway::replies(vec![
            LlmResponse::tool_calls(vec![
                call("call_1", "broken", json!({})),
                ToolCall::new("call_2", "set_face_emotion", "{not json"),
                call("call_3", "set_face_emotion", json!({"emotion": "furious"})),
            ]),
            LlmResponse::text("Sorry."),
        ]));
        let orch = orchestrator(gateway, emotion_registry(&state));

        let reply = orch.respond("Try things").await.unwrap();
        assert_eq!(reply.text, "Sorry.");
        // Failed observed-tool calls are not reported
        assert!(reply.executed_tools.is_empty());

        let history = orch.history().await;
        let results: Vec<&str> = history
            .iter()
            .filter(|m| m.role() == Role::Tool)
            .filter_map(Message::text)
            .collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], "Error executing broken: sensor offline");
        assert!(results[1].starts_with("Error executing set_face_emotion: invalid JSON arguments"));
        assert!(results[2].contains("'furious' is not allowed"));
        assert_eq!(state.last(), "neutral");
    }

    #[tokio::test]
    async fn test_schema_follows_emotion_updates() {
        let state = EmotionState::new(["happy", "sad"]);
        let gateway = Arc::new(ScriptedGateway::replies(vec![
            LlmResponse::text("one"),
            LlmResponse::text("two"),
        ]));
        let orch = orchestrator(gateway.clone(), emotion_registry(&state));

        orch.respond("first").await.unwrap();
        state.set_allowed(["Excited"]).unwrap();
        orch.respond("second").await.unwrap();

        assert_eq!(gateway.seen_enum(0), json!(["happy", "sad"]));
        assert_eq!(gateway.seen_enum(1), json!(["excited"]));
    }

    #[tokio::test]
    async fn test_gateway_error_leaves_state_untouched() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(LlmResponse::text("hello")),
            Err(GatewayError::http(429, "slow down")),
        ]));
        let orch = orchestrator(gateway, ToolRegistry::new());
        orch.respond("one").await.unwrap();
        let before = orch.history().await;

        let err = orch.respond("two").await.unwrap_err();
        match err {
            OrchestratorError::Gateway(e) => assert!(e.is_rate_limited()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(orch.history().await, before);
        assert_eq!(orch.quota().await.request_count, 1);
    }

    #[tokio::test]
    async fn test_gateway_timeout_is_gateway_error() {
        let gateway = Arc::new(ScriptedGateway {
            delay: Some(Duration::from_secs(30)),
            ..ScriptedGateway::replies(vec![LlmResponse::text("too late")])
        });
        let orch = Orchestrator::new(
            gateway,
            ToolRegistry::new(),
            "sys",
            OrchestratorConfig {
                gateway_timeout: Duration::from_millis(50),
                ..Default::default()
            },
        );

        let err = orch.respond("hurry").await.unwrap_err();
        match err {
            OrchestratorError::Gateway(e) => assert_eq!(e.status, None),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(orch.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_response_answers_with_apology() {
        let gateway = Arc::new(ScriptedGateway::replies(vec![LlmResponse {
            content: Some("   ".into()),
            ..Default::default()
        }]));
        let orch = orchestrator(gateway.clone(), ToolRegistry::new());

        let reply = orch.respond("Hello?").await.unwrap();
        assert_eq!(reply.text, EMPTY_RESPONSE_TEXT);
        assert!(reply.executed_tools.is_empty());
        assert_eq!(
            orch.history().await,
            vec![Message::user("Hello?"), Message::assistant(EMPTY_RESPONSE_TEXT)]
        );
        assert_eq!(orch.quota().await.request_count, 1);

        // Recorded like any answer: the same prompt is served from the cache
        assert_eq!(orch.respond("Hello?").await.unwrap().text, EMPTY_RESPONSE_TEXT);
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_content_wins_over_tool_calls() {
        let state = EmotionState::new(["happy"]);
        let gateway = Arc::new(ScriptedGateway::replies(vec![LlmResponse {
            content: Some("Here you go".into()),
            tool_calls: vec![call("call_1", "set_face_emotion", json!({"emotion": "happy"}))],
            ..Default::default()
        }]));
        let orch = orchestrator(gateway, emotion_registry(&state));

        let reply = orch.respond("Hi").await.unwrap();
        assert_eq!(reply.text, "Here you go");
        assert!(reply.executed_tools.is_empty());
        assert_eq!(state.last(), "neutral");
        assert_eq!(orch.history().await.len(), 2);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_and_reset() {
        let gateway = Arc::new(ScriptedGateway::replies(vec![
            LlmResponse::text("a"),
            LlmResponse::text("b"),
        ]));
        let orch = Orchestrator::new(
            gateway.clone(),
            ToolRegistry::new(),
            "sys",
            OrchestratorConfig {
                max_requests: 1,
                ..Default::default()
            },
        );

        orch.respond("one").await.unwrap();
        let err = orch.respond("two").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::QuotaExceeded { limit: 1 }));
        assert_eq!(gateway.calls(), 1);
        assert_eq!(orch.quota().await.remaining, 0);

        orch.reset_quota().await;
        assert_eq!(orch.respond("two").await.unwrap().text, "b");
    }

    #[tokio::test]
    async fn test_reload_tools_applies_to_next_call() {
        let state = EmotionState::new(["happy"]);
        let gateway = Arc::new(ScriptedGateway::replies(vec![
            LlmResponse::text("a"),
            LlmResponse::text("b"),
        ]));
        let orch = orchestrator(gateway.clone(), ToolRegistry::new());

        orch.respond("one").await.unwrap();
        orch.reload_tools(emotion_registry(&state)).await;
        orch.respond("two").await.unwrap();

        assert_eq!(orch.tool_names().await, vec!["broken", "set_face_emotion"]);
        let seen = gateway.seen_tools.lock().unwrap();
        assert!(seen[0].is_empty());
        assert_eq!(seen[1].len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_prompts_are_serialized() {
        let gateway = Arc::new(ScriptedGateway {
            delay: Some(Duration::from_millis(20)),
            ..ScriptedGateway::always(LlmResponse::text("ok"))
        });
        let orch = Arc::new(orchestrator(gateway.clone(), ToolRegistry::new()));

        let a = tokio::spawn({
            let orch = orch.clone();
            async move { orch.respond("first").await }
        });
        let b = tokio::spawn({
            let orch = orch.clone();
            async move { orch.respond("second").await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Each exchange committed whole: user, assistant, user, assistant
        let roles: Vec<Role> = orch.history().await.iter().map(Message::role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
        assert_eq!(orch.quota().await.request_count, 2);
    }

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments("").unwrap().is_empty());
        assert_eq!(
            parse_arguments(r#"{"timezone": "Asia/Tokyo"}"#).unwrap()["timezone"],
            json!("Asia/Tokyo")
        );
        assert!(parse_arguments("[1, 2]").unwrap_err().contains("JSON object"));
        assert!(parse_arguments("{oops").unwrap_err().contains("invalid JSON"));
    }

    #[test]
    fn test_config_from_agent_config() {
        let agent = AgentConfig {
            max_turns: 3,
            strict_history_replace: true,
            gateway_timeout_secs: 10,
            ..Default::default()
        };
        let config = OrchestratorConfig::from(&agent);
        assert_eq!(config.max_turns, 3);
        assert_eq!(config.replace_mode, ReplaceMode::Strict);
        assert_eq!(config.gateway_timeout, Duration::from_secs(10));
        assert_eq!(config.observed_tools, vec!["set_face_emotion"]);
    }

    #[test]
    fn test_config_raises_zero_limits() {
        let agent = AgentConfig {
            max_turns: 0,
            gateway_timeout_secs: 0,
            ..Default::default()
        };
        let config = OrchestratorConfig::from(&agent);
        assert_eq!(config.max_turns, 1);
        assert_eq!(config.gateway_timeout, Duration::from_secs(1));
    }
}
