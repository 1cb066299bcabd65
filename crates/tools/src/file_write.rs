//! File write tool: create or overwrite files inside the workspace.

use async_trait::async_trait;
use localpilot_core::error::ToolError;
use localpilot_core::tool::{Tool, ToolResult};

use crate::path::Workspace;

pub struct FileWriteTool {
    workspace: Workspace,
}

impl FileWriteTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file and missing parent directories if needed, overwrites if it exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the workspace root"
                },
                "content": {
                    "type": "string",
                    "description": "The full new content of the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let resolved = self
            .workspace
            .resolve(path)
            .map_err(|e| e.into_tool_error(self.name()))?;

        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult::error(
                String::new(),
                format!("Failed to create directory: {e}"),
            ));
        }

        match tokio::fs::write(&resolved, content).await {
            Ok(()) => Ok(ToolResult::success(
                String::new(),
                format!("Wrote {} bytes to {path}", content.len()),
            )),
            Err(e) => Ok(ToolResult::error(
                String::new(),
                format!("Failed to write {path}: {e}"),
            )),
        }
    }
}
