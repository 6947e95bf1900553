//! Backend trait — the abstraction over streaming model services.
//!
//! A Backend takes the transcript plus an optional capability schema and
//! answers with an ordered stream of [`StreamEvent`]s. Concrete wire formats
//! (OpenAI Responses SSE, scripted test streams) map onto this taxonomy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::message::Turn;

/// One unit of backend output.
///
/// Events of one call arrive strictly in order and at most one tool call is
/// open at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of answer text.
    TextDelta { text: String },

    /// The backend opened a tool call.
    ToolCallStarted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        name: String,
    },

    /// A fragment of the open call's raw argument payload.
    ToolCallArgsDelta { text: String },

    /// The open call's arguments are complete.
    ToolCallCompleted,

    /// The backend finished this call.
    StreamCompleted,

    /// Anything this build does not understand. Always ignored.
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Short event name used in logs and protocol errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TextDelta { .. } => "text_delta",
            Self::ToolCallStarted { .. } => "tool_call_started",
            Self::ToolCallArgsDelta { .. } => "tool_call_args_delta",
            Self::ToolCallCompleted => "tool_call_completed",
            Self::StreamCompleted => "stream_completed",
            Self::Unknown => "unknown",
        }
    }
}

/// A tool definition sent to the backend so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Everything one backend invocation needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendRequest {
    /// The model to use (e.g., "gpt-5")
    pub model: String,

    /// The full ordered transcript, plus any ephemeral turns for this call
    pub turns: Vec<Turn>,

    /// Capabilities offered for tool selection. Empty forces a text-only answer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl BackendRequest {
    /// Whether this request offers any capabilities.
    pub fn offers_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// The receiving half of one backend call's event stream.
pub type EventReceiver = mpsc::Receiver<std::result::Result<StreamEvent, ProviderError>>;

/// The core Backend trait.
///
/// The orchestrator calls `stream()` without knowing which service answers.
/// Dropping the returned receiver tells the producer to stop.
#[async_trait]
pub trait Backend: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get the ordered event stream for it.
    async fn stream(
        &self,
        request: BackendRequest,
    ) -> std::result::Result<EventReceiver, ProviderError>;
}
