//! Edit tool: patch a file by replacing one exact occurrence of a string.

use async_trait::async_trait;
use localpilot_core::error::ToolError;
use localpilot_core::tool::{Tool, ToolResult};
use serde::Deserialize;

use crate::path::Workspace;

pub struct EditFileTool {
    workspace: Workspace,
}

impl EditFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
struct EditInput {
    path: String,
    old_text: String,
    new_text: String,
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing old_text with new_text. old_text must match exactly once; include surrounding lines to make it unique."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the workspace root"
                },
                "old_text": {
                    "type": "string",
                    "description": "The exact text to replace"
                },
                "new_text": {
                    "type": "string",
                    "description": "The replacement text"
                }
            },
            "required": ["path", "old_text", "new_text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let input: EditInput = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid input for edit_file: {e}")))?;

        if input.old_text.is_empty() {
            return Err(ToolError::InvalidArguments("old_text must not be empty".into()));
        }

        let resolved = self
            .workspace
            .resolve(&input.path)
            .map_err(|e| e.into_tool_error(self.name()))?;

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) => {
                return Ok(ToolResult::error(
                    String::new(),
                    format!("Failed to read {}: {e}", input.path),
                ));
            }
        };

        let count = content.matches(&input.old_text).count();
        if count == 0 {
            return Ok(ToolResult::error(
                String::new(),
                format!(
                    "Text not found in {}: '{}'",
                    input.path,
                    truncate_chars(&input.old_text, 100)
                ),
            ));
        }
        if count > 1 {
            return Ok(ToolResult::error(
                String::new(),
                format!(
                    "Found {count} occurrences in {}; provide a longer, unique old_text",
                    input.path
                ),
            ));
        }

        let patched = content.replacen(&input.old_text, &input.new_text, 1);
        if let Err(e) = tokio::fs::write(&resolved, &patched).await {
            return Ok(ToolResult::error(
                String::new(),
                format!("Failed to write {}: {e}", input.path),
            ));
        }

        Ok(ToolResult::success(
            String::new(),
            format!("Edited {}", input.path),
        ))
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}...")
    }
}
