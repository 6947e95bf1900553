//! Shared test helpers for orchestrator tests.

use pillbox_core::error::ProviderError;
use pillbox_core::provider::{Backend, BackendRequest, EventReceiver, StreamEvent};
use std::sync::Mutex;

type Script = Vec<Result<StreamEvent, ProviderError>>;

/// A backend that replays one scripted event sequence per call.
///
/// Records every request so tests can inspect what the orchestrator sent.
pub struct ScriptedBackend {
    scripts: Mutex<Vec<Script>>,
    requests: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: BackendRequest) -> Result<EventReceiver, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: format!("ScriptedBackend: no script for call #{call}"),
                });
            }
            scripts.remove(0)
        };

        let (tx, rx) = tokio::sync::mpsc::channel(script.len().max(1));
        for event in script {
            tx.try_send(event).unwrap();
        }
        Ok(rx)
    }
}

/// A stream that answers with text only.
pub fn text_script(text: &str) -> Script {
    vec![
        Ok(StreamEvent::TextDelta { text: text.into() }),
        Ok(StreamEvent::StreamCompleted),
    ]
}

/// A stream that requests the given calls, each with its argument JSON.
pub fn tool_script(calls: &[(&str, &str)]) -> Script {
    let mut script = Vec::new();
    for (i, (name, arguments)) in calls.iter().enumerate() {
        script.push(Ok(StreamEvent::ToolCallStarted {
            call_id: Some(format!("call_{i}")),
            name: (*name).into(),
        }));
        script.push(Ok(StreamEvent::ToolCallArgsDelta {
            text: (*arguments).into(),
        }));
        script.push(Ok(StreamEvent::ToolCallCompleted));
    }
    script.push(Ok(StreamEvent::StreamCompleted));
    script
}
