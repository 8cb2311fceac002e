//! Chat turns and per-session conversation history.
//!
//! User asks → Orchestrator appends a user turn → answer (or apology) is
//! appended as an assistant turn. History is append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique identifier for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking about schemes
    User,
    /// The assistant's answer (or apology)
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,

    pub text: String,

    pub timestamp: DateTime<Utc>,

    /// Names of the schemes an assistant turn was grounded on.
    /// Always empty for user turns.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub cited_scheme_names: BTreeSet<String>,
}

impl ChatTurn {
    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
            cited_scheme_names: BTreeSet::new(),
        }
    }

    /// Create an assistant turn citing the given schemes.
    pub fn assistant(text: impl Into<String>, cited: BTreeSet<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            cited_scheme_names: cited,
        }
    }
}

/// The ordered, append-only record of one session's turns.
///
/// Insertion order is chronological order. There is no way to edit or
/// remove a turn; starting over means creating a new history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    id: SessionId,
    turns: Vec<ChatTurn>,
    created_at: DateTime<Utc>,
}

impl ConversationHistory {
    /// Create a new, empty session history.
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            turns: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append a turn at the end of the history.
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The most recent `n` turns, oldest first.
    pub fn last_n(&self, n: usize) -> &[ChatTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}
