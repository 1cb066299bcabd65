//! Run-command tool: execute terminal commands in the workspace.
//!
//! Supports command allowlisting, workspace scoping, and timeout.

use async_trait::async_trait;
use localpilot_core::error::ToolError;
use localpilot_core::tool::{Tool, ToolResult};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::path::Workspace;

/// Execute shell commands with safety constraints.
pub struct RunCommandTool {
    workspace: Workspace,
    /// If non-empty, only these programs may be started.
    allowed_commands: Vec<String>,
    timeout: Duration,
}

impl RunCommandTool {
    pub fn new(workspace: Workspace, allowed_commands: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            workspace,
            allowed_commands,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true;
        }

        let base_cmd = command.split_whitespace().next().unwrap_or("").trim();

        self.allowed_commands.iter().any(|a| a == base_cmd)
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a terminal command in the workspace root and return its exit status, stdout and stderr. Use for builds, tests, git and file listings."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        if !self.is_command_allowed(command) {
            return Err(ToolError::PermissionDenied {
                tool_name: self.name().into(),
                reason: format!(
                    "Command '{}' not in allowlist",
                    command.split_whitespace().next().unwrap_or("")
                ),
            });
        }

        debug!(command = %command, "Executing command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.current_dir(self.workspace.root()).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(output) => output,
            Err(_) => {
                warn!(command = %command, "Command timed out");
                return Err(ToolError::Timeout {
                    tool_name: self.name().into(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();

                if output.status.success() {
                    let text = if stderr.is_empty() {
                        stdout
                    } else {
                        format!("{stdout}\n[stderr]: {stderr}")
                    };
                    Ok(ToolResult::success(String::new(), text.trim()))
                } else {
                    let code = output.status.code().unwrap_or(-1);
                    warn!(command = %command, exit_code = code, "Command failed");
                    let mut result = ToolResult::error(
                        String::new(),
                        format!("Command exited with code {code}"),
                    );
                    result.output = format!("{stdout}\n{stderr}").trim().to_string();
                    Ok(result)
                }
            }
            Err(e) => Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(allowed: Vec<String>) -> RunCommandTool {
        RunCommandTool::new(Workspace::new(std::env::temp_dir()), allowed, 10)
    }

    #[test]
    fn allowlist_check() {
        let tool = tool(vec!["ls".into(), "cat".into(), "git".into()]);
        assert!(tool.is_command_allowed("ls -la"));
        assert!(tool.is_command_allowed("cat file.txt"));
        assert!(tool.is_command_allowed("git status"));
        assert!(!tool.is_command_allowed("rm -rf /"));
        assert!(!tool.is_command_allowed("sudo something"));
    }

    #[test]
    fn empty_allowlist_allows_all() {
        assert!(tool(vec![]).is_command_allowed("anything goes"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn execute_echo() {
        let result = tool(vec![])
            .execute(serde_json::json!({"command": "echo hello"}))
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.output, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_workspace_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let tool = RunCommandTool::new(Workspace::new(dir.path()), vec![], 10);
        let result = tool
            .execute(serde_json::json!({"command": "ls"}))
            .await
            .unwrap();
        assert!(result.output.contains("marker.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_error_result() {
        let result = tool(vec![])
            .execute(serde_json::json!({"command": "echo oops >&2; exit 3"}))
            .await
            .unwrap();
        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("code 3"));
        assert!(result.output.contains("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let tool = RunCommandTool::new(Workspace::new(std::env::temp_dir()), vec![], 1);
        let result = tool.execute(serde_json::json!({"command": "sleep 5"})).await;
        assert!(matches!(result, Err(ToolError::Timeout { timeout_secs: 1, .. })));
    }

    #[tokio::test]
    async fn blocked_command() {
        let result = tool(vec!["ls".into()])
            .execute(serde_json::json!({"command": "rm -rf /"}))
            .await;
        assert!(matches!(result, Err(ToolError::PermissionDenied { .. })));
    }
}
