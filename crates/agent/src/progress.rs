//! Agent progress events.
//!
//! `ProgressEvent` is what a driver (console, test harness, anything else)
//! consumes to render a run as it happens:
//! - `started`     — the user turn was accepted
//! - `chunk`       — partial text from the backend
//! - `tool_call`   — a capability is about to be dispatched
//! - `tool_result` — the capability answered
//! - `final_answer` — terminal, the answer appended to the transcript
//! - `error`       — terminal, the run aborted

use serde::{Deserialize, Serialize};
use std::fmt;

/// Events emitted by the orchestrator during one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// The agent accepted the user turn.
    Started,

    /// Partial text from the backend.
    Chunk { content: String },

    /// The agent is calling a capability.
    ToolCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        input: serde_json::Value,
    },

    /// The capability answered.
    ToolResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        output: serde_json::Value,
        success: bool,
    },

    /// The final answer, already appended to the transcript.
    FinalAnswer {
        content: String,
        rounds: u32,
        tool_calls_made: usize,
    },

    /// The run aborted.
    Error { message: String },
}

impl ProgressEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::FinalAnswer { .. } => "final_answer",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this event ends a run's sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FinalAnswer { .. } | Self::Error { .. })
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "Agent is thinking..."),
            Self::Chunk { content } => write!(f, "{content}"),
            Self::ToolCall { name, .. } => write!(f, "→ Calling tool: {name}"),
            Self::ToolResult {
                output, success, ..
            } => {
                let mark = if *success { '✓' } else { '✗' };
                write!(f, "{mark} Tool result: {output}")
            }
            Self::FinalAnswer { content, .. } => write!(f, "Agent: {content}"),
            Self::Error { message } => write!(f, "Error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_chunk() {
        let event = ProgressEvent::Chunk {
            content: "Hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"chunk""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn event_serialization_tool_call() {
        let event = ProgressEvent::ToolCall {
            id: Some("call_1".into()),
            name: "check_stock".into(),
            input: serde_json::json!({"name": "aspirin"}),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"tool_call""#));
        assert!(json.contains(r#""name":"check_stock""#));
    }

    #[test]
    fn event_serialization_final_answer() {
        let event = ProgressEvent::FinalAnswer {
            content: "Yes".into(),
            rounds: 1,
            tool_calls_made: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"final_answer""#));
        assert!(json.contains(r#""tool_calls_made":2"#));
        assert!(event.is_terminal());
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"tool_result","name":"list_users","output":[],"success":true}"#;
        let event: ProgressEvent = serde_json::from_str(json).unwrap();
        match event {
            ProgressEvent::ToolResult { id, name, .. } => {
                assert!(id.is_none());
                assert_eq!(name, "list_users");
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn event_type_names() {
        assert_eq!(ProgressEvent::Started.event_type(), "started");
        assert_eq!(
            ProgressEvent::Error {
                message: "x".into()
            }
            .event_type(),
            "error"
        );
        assert!(!ProgressEvent::Started.is_terminal());
    }

    #[test]
    fn display_stage_markers() {
        assert_eq!(ProgressEvent::Started.to_string(), "Agent is thinking...");
        assert_eq!(
            ProgressEvent::ToolCall {
                id: None,
                name: "check_stock".into(),
                input: serde_json::json!({}),
            }
            .to_string(),
            "→ Calling tool: check_stock"
        );
        assert_eq!(
            ProgressEvent::ToolResult {
                id: None,
                name: "check_stock".into(),
                output: serde_json::json!({"available": true}),
                success: true,
            }
            .to_string(),
            r#"✓ Tool result: {"available":true}"#
        );
        assert_eq!(
            ProgressEvent::FinalAnswer {
                content: "Yes.".into(),
                rounds: 1,
                tool_calls_made: 1,
            }
            .to_string(),
            "Agent: Yes."
        );
    }
}
