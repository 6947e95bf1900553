//! Tool trait — the abstraction over agent capabilities.
//!
//! Capabilities are the named lookups the backend may ask for. They are
//! registered in a [`ToolRegistry`], which doubles as the dispatch table:
//! resolving a name, parsing the raw argument payload, and folding every
//! failure into a result payload so one bad call never aborts a round.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A fully materialized tool call, produced once its argument stream completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Backend-assigned call ID, when the backend provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Name of the capability to invoke
    pub name: String,

    /// Opaque serialized argument payload; each capability owns its schema
    pub raw_arguments: String,
}

/// The outcome of dispatching one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The capability name that was requested
    pub tool_name: String,

    /// The call ID this result is for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,

    /// Whether a registered capability answered without error
    pub success: bool,

    /// Structured result, an `{error: ..}` payload, or the fallback payload
    pub payload: serde_json::Value,
}

/// The core Tool trait.
///
/// Each capability implements this trait. Capabilities are pure reads over
/// injected data; they validate their own argument shape.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "check_stock").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the backend).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the backend.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The agent uses this to:
/// 1. Get tool definitions to send to the backend
/// 2. Dispatch the calls the backend requests
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
    fallback: serde_json::Value,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            fallback: serde_json::json!({ "message": "I'm not sure about that." }),
        }
    }

    /// Set the payload returned for capability names that are not registered.
    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback = serde_json::json!({ "message": message.into() });
        self
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the backend), sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Check the table against the capability names the agent declares.
    ///
    /// Every required name must be registered, and every schema must be an
    /// object schema whose `required` entries are declared properties.
    pub fn validate(&self, required: &[&str]) -> std::result::Result<(), ToolError> {
        for name in required {
            if !self.tools.contains_key(*name) {
                return Err(ToolError::NotFound((*name).to_string()));
            }
        }

        for (name, tool) in &self.tools {
            let schema = tool.parameters_schema();
            let invalid = |reason: &str| ToolError::InvalidSchema {
                tool_name: name.clone(),
                reason: reason.to_string(),
            };

            if schema["type"].as_str() != Some("object") {
                return Err(invalid("schema type must be \"object\""));
            }
            let properties = schema["properties"]
                .as_object()
                .ok_or_else(|| invalid("schema must declare \"properties\""))?;
            if let Some(required) = schema.get("required") {
                let required = required
                    .as_array()
                    .ok_or_else(|| invalid("\"required\" must be an array"))?;
                for field in required {
                    let field = field
                        .as_str()
                        .ok_or_else(|| invalid("\"required\" entries must be strings"))?;
                    if !properties.contains_key(field) {
                        return Err(invalid(&format!(
                            "required field '{field}' is not a declared property"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Dispatch a call. Never fails: unresolved names, unparsable arguments
    /// and capability errors all become payloads.
    pub async fn dispatch(&self, call: &ToolCallRequest) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            warn!(tool = %call.name, "Unresolved capability requested");
            return ToolResult {
                tool_name: call.name.clone(),
                call_id: call.id.clone(),
                success: false,
                payload: self.fallback.clone(),
            };
        };

        let arguments = parse_arguments(&call.name, &call.raw_arguments);
        debug!(tool = %call.name, %arguments, "Dispatching capability");

        match tool.execute(arguments).await {
            Ok(payload) => ToolResult {
                tool_name: call.name.clone(),
                call_id: call.id.clone(),
                success: true,
                payload,
            },
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Capability failed");
                ToolResult {
                    tool_name: call.name.clone(),
                    call_id: call.id.clone(),
                    success: false,
                    payload: serde_json::json!({ "error": e.to_string() }),
                }
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a raw argument payload into a JSON object.
///
/// Empty, unparsable, or non-object payloads become `{}`.
pub fn parse_arguments(tool_name: &str, raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::Value::Object(serde_json::Map::new());
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        Ok(other) => {
            warn!(tool = %tool_name, payload = %other, "Tool arguments are not an object, using {{}}");
            serde_json::Value::Object(serde_json::Map::new())
        }
        Err(e) => {
            warn!(tool = %tool_name, error = %e, "Unparsable tool arguments, using {{}}");
            serde_json::Value::Object(serde_json::Map::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes its `text` argument back.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
        ) -> std::result::Result<serde_json::Value, ToolError> {
            let text = arguments["text"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;
            Ok(serde_json::json!({ "echo": text }))
        }
    }

    /// Declares a required field it never describes.
    struct BrokenSchemaTool;

    #[async_trait]
    impl Tool for BrokenSchemaTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Schema requires an undeclared field"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object", "properties": {}, "required": ["name"] })
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
        ) -> std::result::Result<serde_json::Value, ToolError> {
            Ok(serde_json::Value::Null)
        }
    }

    fn call(name: &str, raw: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: Some("call_1".into()),
            name: name.into(),
            raw_arguments: raw.into(),
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn registry_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }

    #[tokio::test]
    async fn dispatch_runs_resolved_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let result = registry.dispatch(&call("echo", r#"{"text":"hello"}"#)).await;
        assert!(result.success);
        assert_eq!(result.tool_name, "echo");
        assert_eq!(result.call_id.as_deref(), Some("call_1"));
        assert_eq!(result.payload, serde_json::json!({"echo": "hello"}));
    }

    #[tokio::test]
    async fn dispatch_unresolved_name_returns_fallback() {
        let registry = ToolRegistry::new().with_fallback_message("not sure about that");
        let result = registry.dispatch(&call("frobnicate", "{}")).await;
        assert!(!result.success);
        assert_eq!(
            result.payload,
            serde_json::json!({"message": "not sure about that"})
        );
    }

    #[tokio::test]
    async fn dispatch_tool_error_becomes_error_payload() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let result = registry.dispatch(&call("echo", "")).await;
        assert!(!result.success);
        let error = result.payload["error"].as_str().unwrap();
        assert!(error.contains("Missing 'text' argument"));
    }

    #[test]
    fn malformed_arguments_parse_as_empty_object() {
        assert_eq!(parse_arguments("echo", ""), serde_json::json!({}));
        assert_eq!(parse_arguments("echo", "   "), serde_json::json!({}));
        assert_eq!(parse_arguments("echo", "{\"text\":"), serde_json::json!({}));
        assert_eq!(parse_arguments("echo", "[1,2]"), serde_json::json!({}));
        assert_eq!(
            parse_arguments("echo", r#"{"text":"x"}"#),
            serde_json::json!({"text": "x"})
        );
    }

    #[test]
    fn validate_accepts_complete_table() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.validate(&["echo"]).is_ok());
    }

    #[test]
    fn validate_reports_missing_capability() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let err = registry.validate(&["echo", "check_stock"]).unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "check_stock"));
    }

    #[test]
    fn validate_rejects_undeclared_required_field() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(BrokenSchemaTool));
        let err = registry.validate(&[]).unwrap_err();
        assert!(matches!(err, ToolError::InvalidSchema { ref tool_name, .. } if tool_name == "broken"));
    }
}
