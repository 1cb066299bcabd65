//! File read tool: read file contents inside the workspace.
//!
//! A successful read carries the file path on its result so the agent can
//! fold the content into its master context.

use async_trait::async_trait;
use localpilot_core::error::ToolError;
use localpilot_core::tool::{Tool, ToolResult};

use crate::path::Workspace;

pub struct FileReadTool {
    workspace: Workspace,
}

impl FileReadTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the full contents of a file in the workspace."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the workspace root"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let resolved = self
            .workspace
            .resolve(path)
            .map_err(|e| e.into_tool_error(self.name()))?;

        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Ok(ToolResult::file_content(String::new(), path, content)),
            Err(e) => Ok(ToolResult::error(
                String::new(),
                format!("Failed to read {path}: {e}"),
            )),
        }
    }
}
