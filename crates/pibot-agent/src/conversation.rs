//! Conversation Store — the ordered turn sequence sent to the model.
//!
//! Slot 0 always holds the active system instruction. A store created with
//! `Default` has no system turn yet and refuses appends until one is set.

use pibot_core::types::{HistoryEntry, Message, Role};
use tracing::{debug, warn};

use crate::error::ConversationError;

/// How `replace` treats invalid entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplaceMode {
    /// Skip invalid entries and keep the rest.
    #[default]
    Lenient,
    /// Reject the whole replace on the first invalid entry.
    Strict,
}

impl ReplaceMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            ReplaceMode::Strict
        } else {
            ReplaceMode::Lenient
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationStore {
    turns: Vec<Message>,
}

impl ConversationStore {
    /// Create a store holding only the given system instruction.
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            turns: vec![Message::system(system_instruction)],
        }
    }

    /// The active system instruction, if the store is initialized.
    pub fn system_instruction(&self) -> Option<&str> {
        match self.turns.first() {
            Some(Message::System { content }) => Some(content),
            _ => None,
        }
    }

    fn ensure_initialized(&self) -> Result<(), ConversationError> {
        match self.turns.first() {
            Some(Message::System { .. }) => Ok(()),
            _ => Err(ConversationError::InvariantViolation),
        }
    }

    pub fn append_user(&mut self, text: impl Into<String>) -> Result<(), ConversationError> {
        self.ensure_initialized()?;
        self.turns.push(Message::user(text));
        Ok(())
    }

    /// Append an assistant turn. Any other role is an invariant violation.
    pub fn append_assistant(&mut self, turn: Message) -> Result<(), ConversationError> {
        self.ensure_initialized()?;
        if turn.role() != Role::Assistant {
            return Err(ConversationError::InvariantViolation);
        }
        self.turns.push(turn);
        Ok(())
    }

    pub fn append_tool(
        &mut self,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        result: impl Into<String>,
    ) -> Result<(), ConversationError> {
        self.ensure_initialized()?;
        self.turns.push(Message::tool_result(tool_call_id, name, result));
        Ok(())
    }

    /// Replace the system instruction and drop every other turn.
    pub fn set_system_instruction(&mut self, text: impl Into<String>) {
        self.turns = vec![Message::system(text)];
    }

    /// Drop everything but the system turn.
    pub fn clear(&mut self) {
        self.turns.truncate(1);
    }

    /// Copy of all turns except the system turn.
    pub fn history(&self) -> Vec<Message> {
        self.turns
            .iter()
            .filter(|m| m.role() != Role::System)
            .cloned()
            .collect()
    }

    /// Rebuild the store as `[system] + valid entries`.
    ///
    /// Returns the number of entries admitted. In strict mode the first
    /// invalid entry aborts and the store is left untouched.
    pub fn replace(
        &mut self,
        entries: &[HistoryEntry],
        mode: ReplaceMode,
    ) -> Result<usize, ConversationError> {
        self.ensure_initialized()?;

        let mut admitted = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match validate_entry(entry) {
                Ok(turn) => admitted.push(turn),
                Err(reason) => {
                    if mode == ReplaceMode::Strict {
                        return Err(ConversationError::InvalidHistoryEntry { index, reason });
                    }
                    warn!(index, reason = %reason, "skipping invalid history entry");
                }
            }
        }

        let count = admitted.len();
        self.turns.truncate(1);
        self.turns.extend(admitted);
        debug!(admitted = count, offered = entries.len(), "history replaced");
        Ok(count)
    }

    /// All turns, system included.
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Install a complete working sequence produced by the orchestration loop.
    ///
    /// The sequence must be an extension of `turns()`, so slot 0 is kept.
    pub(crate) fn commit(&mut self, turns: Vec<Message>) {
        debug_assert!(matches!(turns.first(), Some(Message::System { .. })));
        self.turns = turns;
    }
}

fn validate_entry(entry: &HistoryEntry) -> Result<Message, String> {
    if entry.content.trim().is_empty() {
        return Err("text is empty".into());
    }
    match entry.role.as_str() {
        "user" => Ok(Message::user(entry.content.clone())),
        "assistant" => Ok(Message::assistant(entry.content.clone())),
        other => Err(format!("role '{other}' is not user or assistant")),
    }
}
