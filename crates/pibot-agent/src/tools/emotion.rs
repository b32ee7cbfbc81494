//! Facial emotion tool.
//!
//! The permitted labels live in [`EmotionState`], which is shared between the
//! tool and the admin surface. Because `parameters()` reads the list on every
//! call, an update shows up in the very next schema snapshot.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use super::base::{require_string, Tool};

/// Labels allowed before anyone configures the list.
pub const DEFAULT_EMOTIONS: &[&str] = &["happy", "sad", "angry", "neutral"];

/// Reported by `last()` until the model sets something.
pub const INITIAL_EMOTION: &str = "neutral";

#[derive(Debug, Error, PartialEq)]
pub enum EmotionError {
    #[error("allowed emotion list must not be empty")]
    Empty,
}

// ─────────────────────────────────────────────
// EmotionState
// ─────────────────────────────────────────────

#[derive(Debug)]
struct Inner {
    allowed: Vec<String>,
    last: String,
}

/// Allowed emotion labels plus the last one the model chose.
#[derive(Debug)]
pub struct EmotionState {
    inner: RwLock<Inner>,
}

impl EmotionState {
    /// Create the state with an initial allowed list.
    ///
    /// An empty or blank list falls back to [`DEFAULT_EMOTIONS`].
    pub fn new<I, S>(allowed: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut labels = normalize(allowed);
        if labels.is_empty() {
            labels = DEFAULT_EMOTIONS.iter().map(|s| s.to_string()).collect();
        }
        Arc::new(Self {
            inner: RwLock::new(Inner {
                allowed: labels,
                last: INITIAL_EMOTION.to_string(),
            }),
        })
    }

    /// Replace the allowed list. Labels are trimmed, lowercased and deduplicated.
    pub fn set_allowed<I, S>(&self, allowed: I) -> Result<Vec<String>, EmotionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = normalize(allowed);
        if labels.is_empty() {
            return Err(EmotionError::Empty);
        }
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.allowed = labels.clone();
        info!(emotions = ?labels, "allowed emotions updated");
        Ok(labels)
    }

    /// Current allowed labels.
    pub fn allowed(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .allowed
            .clone()
    }

    /// Last emotion set by the model.
    pub fn last(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last
            .clone()
    }

    /// Record `emotion` as the current expression if it is allowed.
    fn apply(&self, emotion: &str) -> Result<(), Vec<String>> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.allowed.iter().any(|e| e == emotion) {
            inner.last = emotion.to_string();
            Ok(())
        } else {
            Err(inner.allowed.clone())
        }
    }
}

fn normalize<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        let label = label.as_ref().trim().to_lowercase();
        if !label.is_empty() && !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

// ─────────────────────────────────────────────
// SetFaceEmotionTool
// ─────────────────────────────────────────────

/// Lets the model pick the robot's facial expression.
pub struct SetFaceEmotionTool {
    state: Arc<EmotionState>,
}

impl SetFaceEmotionTool {
    pub fn new(state: Arc<EmotionState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for SetFaceEmotionTool {
    fn name(&self) -> &str {
        "set_face_emotion"
    }

    fn description(&self) -> &str {
        "Controls the robot's facial expression."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "emotion": {
                    "type": "string",
                    "enum": self.state.allowed(),
                    "description": "The desired facial expression."
                }
            },
            "required": ["emotion"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let emotion = require_string(&params, "emotion")?.trim().to_lowercase();
        match self.state.apply(&emotion) {
            Ok(()) => {
                info!(emotion = %emotion, "face emotion set");
                Ok(format!("Emotion '{emotion}' set successfully."))
            }
            Err(allowed) => anyhow::bail!(
                "Emotion '{emotion}' is not allowed (allowed: {})",
                allowed.join(", ")
            ),
        }
    }
}
