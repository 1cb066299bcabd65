//! Built-in tool implementations for localpilot.
//!
//! Tools give the agent the ability to work on a codebase: read, write and
//! patch files, run terminal commands, and keep a task list. All of them are
//! confined to the configured workspace root.

pub mod edit;
pub mod file_read;
pub mod file_write;
pub mod path;
pub mod shell;
pub mod task;

use localpilot_config::ToolsConfig;
use localpilot_core::tool::ToolRegistry;

pub use path::{PathValidationError, Workspace};

/// Create a tool registry with every built-in tool, scoped by `config`.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let workspace = Workspace::new(config.effective_root());

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(file_read::FileReadTool::new(workspace.clone())));
    registry.register(Box::new(file_write::FileWriteTool::new(workspace.clone())));
    registry.register(Box::new(edit::EditFileTool::new(workspace.clone())));
    registry.register(Box::new(shell::RunCommandTool::new(
        workspace,
        config.allowed_commands.clone(),
        config.command_timeout_secs,
    )));
    registry.register(Box::new(task::TaskTool::new()));
    registry
}
