//! OpenAI Responses API backend.
//!
//! Streams `POST /responses` and maps the typed SSE events onto the
//! [`StreamEvent`] taxonomy:
//!
//! - `response.output_text.delta` → `TextDelta`
//! - `response.output_item.added` (function_call item) → `ToolCallStarted`
//! - `response.function_call_arguments.delta` → `ToolCallArgsDelta`
//! - `response.function_call_arguments.done` → `ToolCallCompleted`
//! - `response.completed` → `StreamCompleted`
//! - `error` / `response.failed` → `ProviderError::StreamInterrupted`
//!
//! Everything else becomes `StreamEvent::Unknown`.

use async_trait::async_trait;
use futures::StreamExt;
use pillbox_core::error::ProviderError;
use pillbox_core::provider::{Backend, BackendRequest, EventReceiver, StreamEvent, ToolDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// A backend speaking the OpenAI Responses streaming protocol.
pub struct OpenAiResponsesBackend {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiResponsesBackend {
    /// Create a new Responses backend.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create a backend for api.openai.com (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Build the JSON request body.
    fn to_api_body(request: &BackendRequest) -> serde_json::Value {
        let input: Vec<ApiInputItem> = request
            .turns
            .iter()
            .map(|t| ApiInputItem {
                role: t.role.as_str().into(),
                content: t.content.clone(),
            })
            .collect();

        let mut body = serde_json::json!({
            "model": request.model,
            "input": input,
            "stream": true,
        });

        if request.offers_tools() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        if let Some(max_tokens) = request.max_output_tokens {
            body["max_output_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    /// Convert tool definitions to the flat Responses `function` shape.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiTool> {
        tools
            .iter()
            .map(|t| ApiTool {
                r#type: "function".into(),
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl Backend for OpenAiResponsesBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: BackendRequest) -> Result<EventReceiver, ProviderError> {
        let url = format!("{}/responses", self.base_url);
        let body = Self::to_api_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            turns = request.turns.len(),
            tools = request.tools.len(),
            "Sending streaming request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider streaming error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Read the SSE byte stream on its own task; a dropped receiver stops it.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = SseLineBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for data in lines.push(&bytes) {
                    if data == "[DONE]" {
                        return;
                    }

                    let Some(event) = parse_event(&data) else {
                        trace!(provider = %provider_name, data = %data, "Ignoring unparseable SSE chunk");
                        continue;
                    };

                    let terminal = matches!(event, Ok(StreamEvent::StreamCompleted) | Err(_));
                    if tx.send(event).await.is_err() {
                        debug!(provider = %provider_name, "Event receiver dropped, closing stream");
                        return;
                    }
                    if terminal {
                        return;
                    }
                }
            }

            debug!(provider = %provider_name, "SSE body ended without response.completed");
        });

        Ok(rx)
    }
}

/// Splits an SSE byte stream into complete `data:` payloads.
///
/// Chunks may cut lines, and UTF-8 sequences, anywhere. Bytes stay buffered
/// until a line is complete and only whole lines are decoded.
#[derive(Debug, Default)]
struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw[..line_end]);
            let line = line.trim_end_matches('\r');

            // Blank separators, comments, and `event:` names carry nothing we
            // need; the JSON payload repeats the type.
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim().to_string());
            }
        }

        payloads
    }
}

/// Map one SSE `data:` payload onto a stream event.
///
/// Returns `None` for payloads that are not JSON.
fn parse_event(data: &str) -> Option<Result<StreamEvent, ProviderError>> {
    let event: SseEvent = serde_json::from_str(data).ok()?;

    let mapped = match event.kind.as_str() {
        "response.output_text.delta" => Ok(StreamEvent::TextDelta {
            text: event.delta.unwrap_or_default(),
        }),
        "response.output_item.added" => match event.item {
            Some(item) if item.r#type == "function_call" => Ok(StreamEvent::ToolCallStarted {
                call_id: item.call_id.or(item.id),
                name: item.name.unwrap_or_default(),
            }),
            _ => Ok(StreamEvent::Unknown),
        },
        "response.function_call_arguments.delta" => Ok(StreamEvent::ToolCallArgsDelta {
            text: event.delta.unwrap_or_default(),
        }),
        "response.function_call_arguments.done" => Ok(StreamEvent::ToolCallCompleted),
        "response.completed" => Ok(StreamEvent::StreamCompleted),
        "error" => Err(ProviderError::StreamInterrupted(
            event.message.unwrap_or_else(|| "unknown stream error".into()),
        )),
        "response.failed" => Err(ProviderError::StreamInterrupted(
            event
                .response
                .and_then(|r| r.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| "response failed".into()),
        )),
        _ => Ok(StreamEvent::Unknown),
    };

    Some(mapped)
}

// --- Responses API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiInputItem {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    r#type: String,
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// A single SSE `data: {...}` payload.
#[derive(Debug, Deserialize)]
struct SseEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    item: Option<SseOutputItem>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    response: Option<SseFailedResponse>,
}

#[derive(Debug, Deserialize)]
struct SseOutputItem {
    r#type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    call_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseFailedResponse {
    #[serde(default)]
    error: Option<SseError>,
}

#[derive(Debug, Deserialize)]
struct SseError {
    #[serde(default)]
    message: Option<String>,
}
