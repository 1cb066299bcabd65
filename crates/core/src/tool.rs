//! Tool trait and gateway: the abstraction over agent capabilities.
//!
//! Tools are what let the agent act on a workspace: read and write files,
//! apply edits, run terminal commands, track tasks. The agent only ever sees
//! the [`ToolGateway`] capability; [`ToolRegistry`] is the in-process gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ToolError;

/// A tool definition advertised to the model in the system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A request to execute a tool, extracted from model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation token echoed back in the tool result
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    pub status: ToolStatus,

    /// The output content
    pub output: String,

    /// Error text when `status` is [`ToolStatus::Error`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Set when `output` is the full readable content of this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Success,
            output: output.into(),
            error: None,
            file_path: None,
        }
    }

    pub fn error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Error,
            output: String::new(),
            error: Some(error.into()),
            file_path: None,
        }
    }

    /// A successful read whose output is the content of `path`.
    pub fn file_content(
        call_id: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut result = Self::success(call_id, content);
        result.file_path = Some(path.into());
        result
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// Human-readable form appended to the conversation.
    pub fn render(&self) -> String {
        match self.status {
            ToolStatus::Success => format!("[SUCCESS]\n{}", self.output),
            ToolStatus::Error => {
                let err = self.error.as_deref().unwrap_or("unknown error");
                if self.output.is_empty() {
                    format!("[ERROR]\n{err}")
                } else {
                    format!("[ERROR]\n{err}\n{}", self.output)
                }
            }
        }
    }
}

/// Check `parameters` against the subset of JSON Schema tools declare:
/// an object with `required` keys and typed `properties`.
pub fn validate_parameters(
    schema: &serde_json::Value,
    parameters: &serde_json::Value,
) -> Result<(), ToolError> {
    let Some(args) = parameters.as_object() else {
        return Err(ToolError::InvalidArguments(format!(
            "parameters must be an object, got {}",
            json_type_name(parameters)
        )));
    };

    if let Some(required) = schema["required"].as_array() {
        for key in required.iter().filter_map(|k| k.as_str()) {
            if !args.contains_key(key) {
                return Err(ToolError::InvalidArguments(format!(
                    "missing required parameter '{key}'"
                )));
            }
        }
    }

    if let Some(properties) = schema["properties"].as_object() {
        for (key, value) in args {
            let Some(expected) = properties.get(key).and_then(|p| p["type"].as_str()) else {
                continue;
            };
            let ok = match expected {
                "string" => value.is_string(),
                "number" => value.is_number(),
                "integer" => value.is_i64() || value.is_u64(),
                "boolean" => value.is_boolean(),
                "object" => value.is_object(),
                "array" => value.is_array(),
                _ => true,
            };
            if !ok {
                return Err(ToolError::InvalidArguments(format!(
                    "parameter '{key}' must be {expected}, got {}",
                    json_type_name(value)
                )));
            }
        }
    }

    Ok(())
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// The core Tool trait.
///
/// Each built-in tool implements this trait and is registered in a
/// [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (shown to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for the system prompt.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The tool execution capability consumed by the agent.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// Execute a call by tool name.
    async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError>;

    /// Definitions of every available tool, used to build the tool catalog.
    fn definitions(&self) -> Vec<ToolDefinition>;
}

/// A registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
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

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolGateway for ToolRegistry {
    async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let mut result = tool.execute(call.parameters.clone()).await?;
        result.call_id = call.id.clone();
        Ok(result)
    }

    /// Sorted by name so the tool catalog is stable across runs.
    fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple test tool for unit tests.
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
            json!({
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
        ) -> std::result::Result<ToolResult, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            Ok(ToolResult::success(String::new(), text))
        }
    }

    fn echo_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry
    }

    #[test]
    fn registry_register_and_lookup() {
        let registry = echo_registry();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn registry_definitions() {
        let defs = echo_registry().definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }

    #[tokio::test]
    async fn registry_execute_sets_call_id() {
        let registry = echo_registry();
        let call = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            parameters: json!({"text": "hello world"}),
        };
        let result = registry.execute(&call).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.output, "hello world");
        assert_eq!(result.call_id, "call_1");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "nonexistent".into(),
            parameters: json!({}),
        };
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn validation_accepts_well_formed_parameters() {
        let schema = EchoTool.parameters_schema();
        assert!(validate_parameters(&schema, &json!({"text": "hi"})).is_ok());
    }

    #[test]
    fn validation_rejects_missing_required() {
        let schema = EchoTool.parameters_schema();
        let err = validate_parameters(&schema, &json!({})).unwrap_err();
        assert!(err.to_string().contains("text"));
    }

    #[test]
    fn validation_rejects_wrong_type_and_non_object() {
        let schema = EchoTool.parameters_schema();
        let err = validate_parameters(&schema, &json!({"text": 42})).unwrap_err();
        assert!(err.to_string().contains("must be string"));

        let err = validate_parameters(&schema, &json!("just a string")).unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }

    #[test]
    fn render_marks_status() {
        assert_eq!(ToolResult::success("1", "ok").render(), "[SUCCESS]\nok");
        assert_eq!(ToolResult::error("1", "boom").render(), "[ERROR]\nboom");
    }

    #[test]
    fn file_content_carries_path() {
        let r = ToolResult::file_content("1", "src/lib.rs", "fn main() {}");
        assert!(r.is_success());
        assert_eq!(r.file_path.as_deref(), Some("src/lib.rs"));
    }
}
