//! The streaming tool-calling agent loop for pillbox.
//!
//! Each user turn follows a **decode → dispatch → synthesize** cycle:
//!
//! 1. **Receive** a user input against a caller-owned transcript
//! 2. **Stream** a backend call with the capability schema, decoding events
//!    into text and completed tool calls
//! 3. **If tool calls**: dispatch them in arrival order and stage their
//!    outputs, for up to `max_rounds` rounds
//! 4. **Synthesize**: one text-only call over the collected results
//!
//! A round without tool calls answers directly, with no synthesis call.

pub mod decoder;
pub mod orchestrator;
pub mod progress;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use decoder::{DecodeResult, Feed, StreamDecoder, decode};
pub use orchestrator::{TurnOrchestrator, TurnOutcome};
pub use progress::ProgressEvent;
pub use prompt::{DEFAULT_SYSTEM_PROMPT, system_prompt};
