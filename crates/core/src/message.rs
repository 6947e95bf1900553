//! Turn and Transcript domain types.
//!
//! A transcript is the conversation history shared across agent steps:
//! Driver owns it → Orchestrator appends to it → Backend reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unique identifier for a transcript (one conversation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranscriptId(pub String);

impl TranscriptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TranscriptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TranscriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions, exactly one per transcript
    System,
    /// The end user
    User,
    /// The assistant, including synthetic tool-output turns
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single turn in a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who authored this turn
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the turn was created
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system turn. Only [`Transcript::new`] can place one.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// An ordered, append-only sequence of turns that opens with exactly one
/// system turn.
///
/// The turn list is private: callers read it through [`Transcript::turns`]
/// and extend it through [`Transcript::push`], so it can never be reordered,
/// truncated, or given a second system turn.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    /// Unique transcript ID
    pub id: TranscriptId,

    turns: Vec<Turn>,

    /// When this transcript was created
    pub created_at: DateTime<Utc>,

    /// When the last turn was appended
    pub updated_at: DateTime<Utc>,
}

impl Transcript {
    /// Start a conversation with its system instructions.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TranscriptId::new(),
            turns: vec![Turn::system(system_prompt)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a user or assistant turn.
    pub fn push(&mut self, turn: Turn) -> Result<()> {
        if turn.role == Role::System {
            return Err(Error::Internal(
                "a transcript holds exactly one system turn".into(),
            ));
        }
        self.updated_at = Utc::now();
        self.turns.push(turn);
        Ok(())
    }

    /// Append a user turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.updated_at = Utc::now();
        self.turns.push(Turn::user(content));
    }

    /// Append an assistant turn.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.updated_at = Utc::now();
        self.turns.push(Turn::assistant(content));
    }

    /// All turns in chronological order, system turn first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The system instructions this conversation was opened with.
    pub fn system_prompt(&self) -> &str {
        &self.turns[0].content
    }

    /// The most recent turn.
    pub fn last(&self) -> &Turn {
        &self.turns[self.turns.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: the system turn is present from construction.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
