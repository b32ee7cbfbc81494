//! `pibot serve` — JSON HTTP API over the orchestrator.
//!
//! Routes mirror the robot's browser extension API: prompting, system
//! message, history management, and emotion control.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use pibot_agent::{
    EmotionState, ExecutedToolCall, Orchestrator, OrchestratorError, QuotaSnapshot,
};
use pibot_core::config::ServerConfig;
use pibot_core::types::{HistoryEntry, Message};

/// Shared handler state.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub emotions: Arc<EmotionState>,
}

type AppStateArc = Arc<AppState>;

// ─────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────

/// Error reply rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        let status = match &e {
            OrchestratorError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            OrchestratorError::Gateway(_) => StatusCode::BAD_GATEWAY,
            OrchestratorError::TurnBudgetExceeded { .. } | OrchestratorError::EmptyResponse => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, e.to_string())
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// ─────────────────────────────────────────────
// Request / response bodies
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub response: String,
    pub executed_tools: Vec<ExecutedToolCall>,
}

#[derive(Debug, Deserialize)]
pub struct SystemMessageRequest {
    #[serde(default)]
    pub system_message: Option<String>,
}

/// Entries stay raw JSON so one malformed element cannot reject the batch.
#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    #[serde(default)]
    pub history: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct HistoryReplaced {
    pub status: &'static str,
    pub turns_set: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct EmotionsRequest {
    #[serde(default)]
    pub emotions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EmotionsUpdated {
    pub status: &'static str,
    pub emotions_updated: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub model: String,
    pub quota: QuotaSnapshot,
    pub tools: Vec<String>,
    pub history_turns: usize,
}

// ─────────────────────────────────────────────
// Routes
// ─────────────────────────────────────────────

pub fn llm_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/ask_llm", post(ask_llm))
        .route("/api/llm_system_message", post(set_system_message))
        .route("/api/llm_history_clear", post(clear_history))
        .route("/api/llm_history", get(get_history).post(replace_history))
        .route("/api/status", get(status))
}

pub fn emotion_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/get_emotion", get(get_emotion))
        .route("/api/set_allowed_emotions", post(set_allowed_emotions))
        .route("/api/get_allowed_emotions", get(get_allowed_emotions))
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(llm_routes())
        .merge(emotion_routes())
        .with_state(Arc::new(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until Ctrl+C.
pub async fn run(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;
    Ok(())
}

// ─────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────

async fn ask_llm(
    State(state): State<AppStateArc>,
    Json(req): Json<AskRequest>,
) -> ApiResult<AskResponse> {
    let prompt = req
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("No prompt provided."))?;

    let reply = state.orchestrator.respond(&prompt).await.map_err(|e| {
        error!(error = %e, "prompt failed");
        ApiError::from(e)
    })?;

    Ok(Json(AskResponse {
        response: reply.text,
        executed_tools: reply.executed_tools,
    }))
}

async fn set_system_message(
    State(state): State<AppStateArc>,
    Json(req): Json<SystemMessageRequest>,
) -> ApiResult<StatusMessage> {
    let message = req
        .system_message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("No system_message provided."))?;

    state.orchestrator.set_system_instruction(message).await;
    Ok(Json(StatusMessage {
        status: "System message updated",
    }))
}

async fn clear_history(State(state): State<AppStateArc>) -> Json<StatusMessage> {
    state.orchestrator.clear_history().await;
    Json(StatusMessage {
        status: "Conversation history cleared",
    })
}

async fn get_history(State(state): State<AppStateArc>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        history: state.orchestrator.history().await,
    })
}

async fn replace_history(
    State(state): State<AppStateArc>,
    Json(req): Json<HistoryRequest>,
) -> ApiResult<HistoryReplaced> {
    let entries: Vec<HistoryEntry> = req.history.iter().map(HistoryEntry::from_value).collect();
    let turns_set = state
        .orchestrator
        .replace_history(&entries)
        .await
        .map_err(|e| {
            warn!(error = %e, "history replace rejected");
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        })?;

    Ok(Json(HistoryReplaced {
        status: "History replaced",
        turns_set,
    }))
}

async fn status(State(state): State<AppStateArc>) -> Json<ServiceStatus> {
    let orch = &state.orchestrator;
    Json(ServiceStatus {
        model: orch.model().to_string(),
        quota: orch.quota().await,
        tools: orch.tool_names().await,
        history_turns: orch.history().await.len(),
    })
}

async fn get_emotion(State(state): State<AppStateArc>) -> Json<serde_json::Value> {
    Json(json!({ "emotion": state.emotions.last() }))
}

async fn set_allowed_emotions(
    State(state): State<AppStateArc>,
    Json(req): Json<EmotionsRequest>,
) -> ApiResult<EmotionsUpdated> {
    let emotions = state
        .emotions
        .set_allowed(&req.emotions)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    Ok(Json(EmotionsUpdated {
        status: "success",
        emotions_updated: emotions,
    }))
}

async fn get_allowed_emotions(State(state): State<AppStateArc>) -> Json<serde_json::Value> {
    Json(json!({ "emotions": state.emotions.allowed() }))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
