//! # pillbox core
//!
//! Domain types, traits, and error definitions for the pillbox agent.
//! This crate has **no framework dependencies**. It defines the model that
//! the backend, capability and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is a trait or a plain value here:
//! - [`Backend`] streams [`StreamEvent`]s for one model call
//! - [`Tool`] is one named capability, collected in a [`ToolRegistry`]
//! - [`Transcript`] is the append-only turn history owned by the caller
//!
//! Tests substitute scripted backends and fixture catalogs without any
//! process-level setup.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProtocolError, ProviderError, Result, ToolError};
pub use message::{Role, Transcript, TranscriptId, Turn};
pub use provider::{Backend, BackendRequest, EventReceiver, StreamEvent, ToolDefinition};
pub use tool::{Tool, ToolCallRequest, ToolRegistry, ToolResult};
