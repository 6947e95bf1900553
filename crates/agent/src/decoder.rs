//! Event stream decoder.
//!
//! Turns one backend call's ordered [`StreamEvent`]s into accumulated answer
//! text plus the tool calls whose argument streams completed. At most one
//! tool call may be open at a time; any event that breaks that rule is a
//! [`ProtocolError`].
//!
//! [`StreamDecoder`] is the synchronous state machine. The orchestrator
//! feeds it directly so it can forward text deltas as they arrive;
//! [`decode`] drains a whole stream for callers that only want the result.

use futures::{Stream, StreamExt};
use pillbox_core::error::{Error, ProtocolError, ProviderError};
use pillbox_core::provider::StreamEvent;
use pillbox_core::tool::ToolCallRequest;
use tracing::trace;

/// Everything one backend call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeResult {
    /// Concatenation of every text delta, in arrival order
    pub text: String,

    /// Completed tool calls, in the order their completion arrived
    pub tool_calls: Vec<ToolCallRequest>,
}

/// What the caller should do after feeding one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// A text delta was accumulated; forward it to whoever renders progress.
    Text(String),
    /// Nothing to report, keep feeding.
    Continue,
    /// The backend signalled the end of this call. Stop consuming.
    Finished,
}

/// The call whose arguments are still streaming.
#[derive(Debug)]
struct PendingCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Incremental decoder for one backend call.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    text: String,
    completed: Vec<ToolCallRequest>,
    pending: Option<PendingCall>,
    finished: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `StreamCompleted` has been observed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed the next event.
    ///
    /// Events after `StreamCompleted` are ignored.
    pub fn feed(&mut self, event: StreamEvent) -> Result<Feed, ProtocolError> {
        if self.finished {
            trace!(event = event.kind(), "Ignoring event after stream completion");
            return Ok(Feed::Finished);
        }

        match event {
            StreamEvent::TextDelta { text } => {
                self.text.push_str(&text);
                Ok(Feed::Text(text))
            }
            StreamEvent::ToolCallStarted { call_id, name } => {
                if let Some(open) = &self.pending {
                    return Err(ProtocolError::ToolCallAlreadyOpen {
                        open: open.name.clone(),
                        incoming: name,
                    });
                }
                trace!(tool = %name, "Tool call opened");
                self.pending = Some(PendingCall {
                    id: call_id,
                    name,
                    arguments: String::new(),
                });
                Ok(Feed::Continue)
            }
            StreamEvent::ToolCallArgsDelta { text } => {
                let pending = self.pending.as_mut().ok_or(ProtocolError::NoOpenToolCall {
                    event: "tool_call_args_delta",
                })?;
                pending.arguments.push_str(&text);
                Ok(Feed::Continue)
            }
            StreamEvent::ToolCallCompleted => {
                let pending = self.pending.take().ok_or(ProtocolError::NoOpenToolCall {
                    event: "tool_call_completed",
                })?;
                trace!(tool = %pending.name, bytes = pending.arguments.len(), "Tool call completed");
                self.completed.push(ToolCallRequest {
                    id: pending.id,
                    name: pending.name,
                    raw_arguments: pending.arguments,
                });
                Ok(Feed::Continue)
            }
            StreamEvent::StreamCompleted => {
                if let Some(open) = &self.pending {
                    return Err(ProtocolError::StreamEndedWithOpenToolCall {
                        name: open.name.clone(),
                    });
                }
                self.finished = true;
                Ok(Feed::Finished)
            }
            StreamEvent::Unknown => Ok(Feed::Continue),
        }
    }

    /// Close the decoder once the event sequence is exhausted.
    ///
    /// A call still open at this point is a protocol error: its arguments
    /// are incomplete.
    pub fn finish(self) -> Result<DecodeResult, ProtocolError> {
        if let Some(open) = self.pending {
            return Err(ProtocolError::StreamEndedWithOpenToolCall { name: open.name });
        }
        Ok(DecodeResult {
            text: self.text,
            tool_calls: self.completed,
        })
    }
}

/// Drain an event stream into a [`DecodeResult`].
///
/// Stops at `StreamCompleted` or when the stream ends, whichever comes first.
pub async fn decode<S>(mut events: S) -> Result<DecodeResult, Error>
where
    S: Stream<Item = Result<StreamEvent, ProviderError>> + Unpin,
{
    let mut decoder = StreamDecoder::new();
    while let Some(event) = events.next().await {
        if decoder.feed(event?)? == Feed::Finished {
            break;
        }
    }
    Ok(decoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn started(name: &str) -> StreamEvent {
        StreamEvent::ToolCallStarted {
            call_id: Some(format!("call_{name}")),
            name: name.into(),
        }
    }

    fn args(text: &str) -> StreamEvent {
        StreamEvent::ToolCallArgsDelta { text: text.into() }
    }

    fn text(text: &str) -> StreamEvent {
        StreamEvent::TextDelta { text: text.into() }
    }

    fn run(events: Vec<StreamEvent>) -> Result<DecodeResult, ProtocolError> {
        let mut decoder = StreamDecoder::new();
        for event in events {
            if decoder.feed(event)? == Feed::Finished {
                break;
            }
        }
        decoder.finish()
    }

    #[test]
    fn text_only_stream() {
        let result = run(vec![text("Hel"), text("lo!"), StreamEvent::StreamCompleted]).unwrap();
        assert_eq!(result.text, "Hello!");
        assert!(result.tool_calls.is_empty());
    }

    #[test]
    fn tool_call_arguments_are_assembled() {
        let result = run(vec![
            started("check_stock"),
            args("{\"name\""),
            args(": \"aspirin\"}"),
            StreamEvent::ToolCallCompleted,
            StreamEvent::StreamCompleted,
        ])
        .unwrap();

        assert_eq!(
            result.tool_calls,
            vec![ToolCallRequest {
                id: Some("call_check_stock".into()),
                name: "check_stock".into(),
                raw_arguments: "{\"name\": \"aspirin\"}".into(),
            }]
        );
    }

    #[test]
    fn calls_keep_completion_order() {
        let result = run(vec![
            started("get_user_by_name"),
            StreamEvent::ToolCallCompleted,
            text("checking"),
            started("list_users"),
            StreamEvent::ToolCallCompleted,
            StreamEvent::StreamCompleted,
        ])
        .unwrap();

        let names: Vec<_> = result.tool_calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["get_user_by_name", "list_users"]);
        assert_eq!(result.text, "checking");
    }

    #[test]
    fn unknown_events_are_ignored() {
        let result = run(vec![
            StreamEvent::Unknown,
            started("check_stock"),
            StreamEvent::Unknown,
            StreamEvent::ToolCallCompleted,
            StreamEvent::StreamCompleted,
        ])
        .unwrap();
        assert_eq!(result.tool_calls.len(), 1);
    }

    #[test]
    fn stream_may_end_without_completion_event() {
        let result = run(vec![text("partial")]).unwrap();
        assert_eq!(result.text, "partial");
    }

    #[test]
    fn events_after_completion_are_ignored() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.feed(StreamEvent::StreamCompleted).unwrap(), Feed::Finished);
        assert!(decoder.is_finished());
        assert_eq!(decoder.feed(text("late")).unwrap(), Feed::Finished);
        assert_eq!(decoder.finish().unwrap().text, "");
    }

    #[test]
    fn second_start_while_open_is_protocol_error() {
        let err = run(vec![started("check_stock"), started("list_users")]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::ToolCallAlreadyOpen {
                open: "check_stock".into(),
                incoming: "list_users".into(),
            }
        );
    }

    #[test]
    fn args_without_open_call_is_protocol_error() {
        let err = run(vec![args("{}")]).unwrap_err();
        assert!(matches!(err, ProtocolError::NoOpenToolCall { .. }));
    }

    #[test]
    fn completion_without_open_call_is_protocol_error() {
        let err = run(vec![StreamEvent::ToolCallCompleted]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::NoOpenToolCall {
                event: "tool_call_completed"
            }
        );
    }

    #[test]
    fn stream_completed_with_open_call_is_protocol_error() {
        let err = run(vec![
            started("check_stock"),
            args("{\"name\":"),
            StreamEvent::StreamCompleted,
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::StreamEndedWithOpenToolCall {
                name: "check_stock".into()
            }
        );
    }

    #[test]
    fn exhausted_stream_with_open_call_is_protocol_error() {
        let err = run(vec![started("check_stock")]).unwrap_err();
        assert!(matches!(err, ProtocolError::StreamEndedWithOpenToolCall { .. }));
    }

    #[tokio::test]
    async fn decode_drains_stream() {
        let events = futures::stream::iter(vec![
            Ok(text("Yes")),
            Ok(StreamEvent::StreamCompleted),
            Ok(text(" ignored")),
        ]);
        let result = decode(events).await.unwrap();
        assert_eq!(result.text, "Yes");
    }

    #[tokio::test]
    async fn decode_surfaces_provider_errors() {
        let events = futures::stream::iter(vec![
            Ok(text("Ye")),
            Err(ProviderError::StreamInterrupted("connection reset".into())),
        ]);
        let err = decode(events).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::StreamInterrupted(_))));
    }

    #[tokio::test]
    async fn decode_surfaces_protocol_errors() {
        let events = futures::stream::iter(vec![Ok(StreamEvent::ToolCallCompleted)]);
        let err = decode(events).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    // --- Property tests ---

    /// One well-formed piece of a backend stream.
    #[derive(Debug, Clone)]
    enum Segment {
        Text(String),
        Call { name: String, fragments: Vec<String> },
        Unknown,
    }

    fn arb_segment() -> impl Strategy<Value = Segment> {
        prop_oneof![
            3 => "[a-zA-Z0-9 .,!?]{0,20}".prop_map(Segment::Text),
            2 => ("[a-z_]{3,20}", proptest::collection::vec("[a-z0-9{}:\" ]{0,10}", 0..5))
                .prop_map(|(name, fragments)| Segment::Call { name, fragments }),
            1 => Just(Segment::Unknown),
        ]
    }

    fn to_events(segments: &[Segment]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for segment in segments {
            match segment {
                Segment::Text(t) => events.push(text(t)),
                Segment::Call { name, fragments } => {
                    events.push(StreamEvent::ToolCallStarted {
                        call_id: None,
                        name: name.clone(),
                    });
                    events.extend(fragments.iter().map(|f| args(f)));
                    events.push(StreamEvent::ToolCallCompleted);
                }
                Segment::Unknown => events.push(StreamEvent::Unknown),
            }
        }
        events
    }

    proptest! {
        #[test]
        fn balanced_streams_decode_completely(
            segments in proptest::collection::vec(arb_segment(), 0..20),
            completed in any::<bool>(),
        ) {
            let mut events = to_events(&segments);
            if completed {
                events.push(StreamEvent::StreamCompleted);
            }
            let result = run(events).unwrap();

            let expected_text: String = segments
                .iter()
                .filter_map(|s| match s {
                    Segment::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect();
            let expected_calls: Vec<(String, String)> = segments
                .iter()
                .filter_map(|s| match s {
                    Segment::Call { name, fragments } => Some((name.clone(), fragments.concat())),
                    _ => None,
                })
                .collect();
            let decoded_calls: Vec<(String, String)> = result
                .tool_calls
                .iter()
                .map(|c| (c.name.clone(), c.raw_arguments.clone()))
                .collect();

            prop_assert_eq!(result.text, expected_text);
            prop_assert_eq!(decoded_calls, expected_calls);
        }

        #[test]
        fn orphan_call_events_always_fail(
            prefix in proptest::collection::vec(arb_segment(), 0..10),
            orphan_is_completion in any::<bool>(),
        ) {
            let mut events = to_events(&prefix);
            events.push(if orphan_is_completion {
                StreamEvent::ToolCallCompleted
            } else {
                args("{}")
            });
            let is_no_open_call = matches!(run(events), Err(ProtocolError::NoOpenToolCall { .. }));
            prop_assert!(is_no_open_call);
        }

        #[test]
        fn nested_start_always_fails(
            prefix in proptest::collection::vec(arb_segment(), 0..10),
            first in "[a-z_]{3,20}",
            second in "[a-z_]{3,20}",
        ) {
            let mut events = to_events(&prefix);
            events.push(started(&first));
            events.push(started(&second));
            let is_already_open = matches!(run(events), Err(ProtocolError::ToolCallAlreadyOpen { .. }));
            prop_assert!(is_already_open);
        }
    }
}
