//! The turn orchestrator.
//!
//! One `run` handles one user input against a caller-owned transcript:
//!
//! 1. Append the user turn and announce the run
//! 2. Call the backend with the capability schema and decode the stream
//! 3. No tool calls: the decoded text is the final answer
//! 4. Otherwise dispatch each call in completion order, staging a
//!    `[Tool output: <name>] <json>` assistant turn per call
//! 5. Repeat 2–4 up to `max_rounds`, then synthesize: one more call with no
//!    tools and an ephemeral `Use this data if present: <results>` user turn
//! 6. Commit the staged turns and the answer, emit `FinalAnswer`
//!
//! Only backend and protocol failures abort a run. An aborted run leaves the
//! user turn as its only trace in the transcript.

use futures::StreamExt;
use pillbox_core::error::{Error, Result};
use pillbox_core::message::{Transcript, Turn};
use pillbox_core::provider::{Backend, BackendRequest, ToolDefinition};
use pillbox_core::tool::{ToolRegistry, ToolResult};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::decoder::{DecodeResult, Feed, StreamDecoder};
use crate::progress::ProgressEvent;

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The answer appended to the transcript
    pub answer: String,

    /// Tool-offering rounds spent (the synthesis call is not counted)
    pub rounds: u32,

    /// Capabilities dispatched across all rounds
    pub tool_calls_made: usize,
}

/// Drives the backend and the capability table for one user turn at a time.
pub struct TurnOrchestrator {
    /// The backend to stream from
    backend: Arc<dyn Backend>,

    /// Capability dispatch table
    tools: Arc<ToolRegistry>,

    /// The model to request
    model: String,

    /// Maximum tool-dispatch rounds per run
    max_rounds: u32,

    /// Default max tokens per backend call
    max_output_tokens: Option<u32>,

    /// Key collected results by call id instead of tool name
    key_by_call_id: bool,
}

impl TurnOrchestrator {
    /// Create a new orchestrator with a single dispatch round.
    pub fn new(
        backend: Arc<dyn Backend>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            tools,
            model: model.into(),
            max_rounds: 1,
            max_output_tokens: None,
            key_by_call_id: false,
        }
    }

    /// Create an orchestrator configured from `[agent]` and the model settings.
    pub fn from_config(
        config: &pillbox_config::AppConfig,
        backend: Arc<dyn Backend>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        let mut orchestrator = Self::new(backend, tools, &config.model)
            .with_max_rounds(config.agent.max_rounds)
            .with_results_keyed_by_call_id(config.agent.key_results_by_call_id);
        if let Some(max) = config.max_output_tokens {
            orchestrator = orchestrator.with_max_output_tokens(max);
        }
        orchestrator
    }

    /// Set the maximum number of tool-dispatch rounds. 0 is treated as 1.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    /// Set the default max tokens per backend call.
    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    /// Key collected results by call id, so repeated calls to one capability
    /// all reach the synthesis step. Calls without an id use `<name>#<index>`.
    pub fn with_results_keyed_by_call_id(mut self, enabled: bool) -> Self {
        self.key_by_call_id = enabled;
        self
    }

    /// Run one user turn.
    ///
    /// Progress goes to `progress` as it happens; if that receiver is gone the
    /// run stops with [`Error::Cancelled`] before its next side effect.
    pub async fn run(
        &self,
        transcript: &mut Transcript,
        input: &str,
        progress: &mpsc::Sender<ProgressEvent>,
    ) -> Result<TurnOutcome> {
        transcript.push_user(input);
        info!(
            transcript_id = %transcript.id,
            turns = transcript.len(),
            "Processing user turn"
        );
        emit(progress, ProgressEvent::Started).await?;

        let definitions = self.tools.definitions();
        let mut staged: Vec<Turn> = Vec::new();
        let mut results = serde_json::Map::new();
        let mut tool_calls_made = 0;
        let mut rounds = 0;

        while rounds < self.max_rounds {
            rounds += 1;
            debug!(transcript_id = %transcript.id, round = rounds, "Agent round");

            let turns = context(transcript, &staged, None);
            let decoded = self.invoke(turns, definitions.clone(), progress).await?;

            if decoded.tool_calls.is_empty() {
                return self
                    .commit(transcript, staged, decoded.text, rounds, tool_calls_made, progress)
                    .await;
            }

            debug!(tool_calls = decoded.tool_calls.len(), "Dispatching tool calls");

            for call in &decoded.tool_calls {
                emit(
                    progress,
                    ProgressEvent::ToolCall {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: preview_arguments(&call.raw_arguments),
                    },
                )
                .await?;

                let result = self.tools.dispatch(call).await;
                let key = self.result_key(&result, tool_calls_made);
                tool_calls_made += 1;

                emit(
                    progress,
                    ProgressEvent::ToolResult {
                        id: result.call_id.clone(),
                        name: result.tool_name.clone(),
                        output: result.payload.clone(),
                        success: result.success,
                    },
                )
                .await?;

                staged.push(Turn::assistant(format!(
                    "[Tool output: {}] {}",
                    result.tool_name,
                    serde_json::to_string(&result.payload)?
                )));
                if results.insert(key.clone(), result.payload).is_some() {
                    debug!(key = %key, "Replacing earlier result with the same key");
                }
            }
        }

        // Synthesis: text only, with everything collected so far.
        let data = serde_json::to_string(&serde_json::Value::Object(results))?;
        let instruction = Turn::user(format!("Use this data if present: {data}"));
        let turns = context(transcript, &staged, Some(instruction));
        let decoded = self.invoke(turns, Vec::new(), progress).await?;

        if !decoded.tool_calls.is_empty() {
            warn!(
                tool_calls = decoded.tool_calls.len(),
                "Backend requested tools during synthesis, ignoring"
            );
        }

        self.commit(transcript, staged, decoded.text, rounds, tool_calls_made, progress)
            .await
    }

    /// Spawn a run on a shared transcript and stream its progress.
    ///
    /// The transcript stays locked for the whole run, so runs against one
    /// transcript are serialized. The stream ends with exactly one
    /// `FinalAnswer` or `Error`. The channel holds a single event, so the run
    /// advances only as fast as it is consumed; dropping the receiver cancels
    /// it before its next backend call, dispatch or commit.
    pub fn run_stream(
        self: &Arc<Self>,
        transcript: Arc<Mutex<Transcript>>,
        input: impl Into<String>,
    ) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(1);
        let orchestrator = Arc::clone(self);
        let input = input.into();

        tokio::spawn(async move {
            let mut transcript = transcript.lock().await;
            match orchestrator.run(&mut transcript, &input, &tx).await {
                Ok(outcome) => {
                    debug!(rounds = outcome.rounds, tool_calls = outcome.tool_calls_made, "Run finished");
                }
                Err(Error::Cancelled) => {
                    debug!(transcript_id = %transcript.id, "Run cancelled by consumer");
                }
                Err(e) => {
                    warn!(transcript_id = %transcript.id, error = %e, "Run aborted");
                    let _ = tx
                        .send(ProgressEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        });

        rx
    }

    /// One backend call, decoded, with text deltas forwarded as chunks.
    async fn invoke(
        &self,
        turns: Vec<Turn>,
        tools: Vec<ToolDefinition>,
        progress: &mpsc::Sender<ProgressEvent>,
    ) -> Result<DecodeResult> {
        let request = BackendRequest {
            model: self.model.clone(),
            turns,
            tools,
            max_output_tokens: self.max_output_tokens,
        };

        debug!(
            backend = %self.backend.name(),
            turns = request.turns.len(),
            offers_tools = request.offers_tools(),
            "Calling backend"
        );

        let mut events = ReceiverStream::new(self.backend.stream(request).await?);
        let mut decoder = StreamDecoder::new();

        while let Some(event) = events.next().await {
            match decoder.feed(event?)? {
                Feed::Text(content) => emit(progress, ProgressEvent::Chunk { content }).await?,
                Feed::Continue => {}
                Feed::Finished => break,
            }
        }

        Ok(decoder.finish()?)
    }

    /// Append staged tool turns and the answer, then announce it.
    async fn commit(
        &self,
        transcript: &mut Transcript,
        staged: Vec<Turn>,
        answer: String,
        rounds: u32,
        tool_calls_made: usize,
        progress: &mpsc::Sender<ProgressEvent>,
    ) -> Result<TurnOutcome> {
        for turn in staged {
            transcript.push(turn)?;
        }
        transcript.push_assistant(answer.clone());

        info!(
            transcript_id = %transcript.id,
            rounds,
            tool_calls = tool_calls_made,
            "Final answer ready"
        );

        // The answer is committed; a vanished consumer no longer matters.
        let final_event = ProgressEvent::FinalAnswer {
            content: answer.clone(),
            rounds,
            tool_calls_made,
        };
        if progress.send(final_event).await.is_err() {
            debug!("Progress receiver dropped before the final answer");
        }

        Ok(TurnOutcome {
            answer,
            rounds,
            tool_calls_made,
        })
    }

    fn result_key(&self, result: &ToolResult, index: usize) -> String {
        if !self.key_by_call_id {
            return result.tool_name.clone();
        }
        result
            .call_id
            .clone()
            .unwrap_or_else(|| format!("{}#{}", result.tool_name, index))
    }
}

/// Send a progress event, treating a closed channel as cancellation.
///
/// Returns once the channel has room again. On a single-slot channel that
/// means the consumer has taken the event and is still listening, so the
/// next side effect only happens on demand.
async fn emit(progress: &mpsc::Sender<ProgressEvent>, event: ProgressEvent) -> Result<()> {
    progress.send(event).await.map_err(|_| Error::Cancelled)?;
    drop(progress.reserve().await.map_err(|_| Error::Cancelled)?);
    // A freed slot can be handed over just before the receiver is dropped.
    if progress.is_closed() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// The turns one backend call sees: the transcript, this run's staged tool
/// outputs, and an optional ephemeral turn.
fn context(transcript: &Transcript, staged: &[Turn], ephemeral: Option<Turn>) -> Vec<Turn> {
    transcript
        .turns()
        .iter()
        .chain(staged)
        .cloned()
        .chain(ephemeral)
        .collect()
}

/// Arguments as shown to progress consumers. The registry does the real
/// parsing (and the logging) at dispatch.
fn preview_arguments(raw: &str) -> serde_json::Value {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .filter(serde_json::Value::is_object)
        .unwrap_or_else(|| serde_json::json!({}))
}
