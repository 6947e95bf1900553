//! Error types for the pillbox domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all pillbox operations.
///
/// Only [`Error::Protocol`], [`Error::Provider`] and [`Error::Cancelled`] can
/// escape an agent run; tool failures are folded into result payloads.
#[derive(Debug, Error)]
pub enum Error {
    // --- Backend errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Stream decoding errors ---
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The progress consumer went away before the run finished.
    #[error("Run cancelled: progress receiver dropped")]
    Cancelled,

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Malformed or out-of-order backend stream events.
///
/// Fatal to the run that observed them: no answer is synthesized from a
/// corrupted stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("tool call '{incoming}' started while '{open}' is still open")]
    ToolCallAlreadyOpen { open: String, incoming: String },

    #[error("{event} received with no open tool call")]
    NoOpenToolCall { event: &'static str },

    #[error("stream completed while tool call '{name}' was still open")]
    StreamEndedWithOpenToolCall { name: String },
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid schema for tool {tool_name}: {reason}")]
    InvalidSchema { tool_name: String, reason: String },
}
