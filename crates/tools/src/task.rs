//! Task tool: an in-memory task list the agent uses to track its plan.

use async_trait::async_trait;
use localpilot_core::error::ToolError;
use localpilot_core::tool::{Tool, ToolResult};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub done: bool,
}

#[derive(Debug, Default)]
struct TaskList {
    next_id: u64,
    tasks: Vec<Task>,
}

/// Add, list, complete and remove tasks for the current session.
#[derive(Default)]
pub struct TaskTool {
    state: Mutex<TaskList>,
}

impl TaskTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the current tasks, in creation order.
    pub async fn tasks(&self) -> Vec<Task> {
        self.state.lock().await.tasks.clone()
    }
}

fn required_id(arguments: &serde_json::Value) -> Result<u64, ToolError> {
    arguments["id"]
        .as_u64()
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'id' argument".into()))
}

fn render(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks.".into();
    }
    tasks
        .iter()
        .map(|t| {
            let mark = if t.done { "x" } else { " " };
            format!("[{mark}] #{} {}", t.id, t.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn description(&self) -> &str {
        "Track work items. action=add needs title; action=complete and action=remove need id; action=list shows all tasks."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["add", "list", "complete", "remove"],
                    "description": "What to do"
                },
                "title": {
                    "type": "string",
                    "description": "Task title (add)"
                },
                "id": {
                    "type": "integer",
                    "description": "Task id (complete, remove)"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let action = arguments["action"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'action' argument".into()))?;

        let mut state = self.state.lock().await;

        match action {
            "add" => {
                let title = arguments["title"]
                    .as_str()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| ToolError::InvalidArguments("Missing 'title' argument".into()))?;
                state.next_id += 1;
                let id = state.next_id;
                state.tasks.push(Task {
                    id,
                    title: title.to_string(),
                    done: false,
                });
                Ok(ToolResult::success(String::new(), format!("Added task #{id}: {title}")))
            }
            "list" => Ok(ToolResult::success(String::new(), render(&state.tasks))),
            "complete" => {
                let id = required_id(&arguments)?;
                match state.tasks.iter_mut().find(|t| t.id == id) {
                    Some(task) => {
                        task.done = true;
                        Ok(ToolResult::success(String::new(), format!("Completed task #{id}")))
                    }
                    None => Ok(ToolResult::error(String::new(), format!("No task with id {id}"))),
                }
            }
            "remove" => {
                let id = required_id(&arguments)?;
                let before = state.tasks.len();
                state.tasks.retain(|t| t.id != id);
                if state.tasks.len() < before {
                    Ok(ToolResult::success(String::new(), format!("Removed task #{id}")))
                } else {
                    Ok(ToolResult::error(String::new(), format!("No task with id {id}")))
                }
            }
            other => Err(ToolError::InvalidArguments(format!(
                "Unknown action '{other}', expected add|list|complete|remove"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn add_complete_list() {
        let tool = TaskTool::new();
        let r = tool
            .execute(json!({"action": "add", "title": "write tests"}))
            .await
            .unwrap();
        assert_eq!(r.output, "Added task #1: write tests");
        tool.execute(json!({"action": "add", "title": "fix bug"}))
            .await
            .unwrap();
        tool.execute(json!({"action": "complete", "id": 1}))
            .await
            .unwrap();

        let list = tool.execute(json!({"action": "list"})).await.unwrap();
        assert_eq!(list.output, "[x] #1 write tests\n[ ] #2 fix bug");
    }

    #[tokio::test]
    async fn remove_and_unknown_id() {
        let tool = TaskTool::new();
        tool.execute(json!({"action": "add", "title": "a"}))
            .await
            .unwrap();
        let r = tool.execute(json!({"action": "remove", "id": 1})).await.unwrap();
        assert!(r.is_success());
        assert!(tool.tasks().await.is_empty());

        let r = tool.execute(json!({"action": "remove", "id": 1})).await.unwrap();
        assert!(!r.is_success());
    }

    #[tokio::test]
    async fn ids_are_not_reused() {
        let tool = TaskTool::new();
        tool.execute(json!({"action": "add", "title": "a"})).await.unwrap();
        tool.execute(json!({"action": "remove", "id": 1})).await.unwrap();
        let r = tool.execute(json!({"action": "add", "title": "b"})).await.unwrap();
        assert!(r.output.starts_with("Added task #2"));
    }

    #[tokio::test]
    async fn empty_list() {
        let r = TaskTool::new()
            .execute(json!({"action": "list"}))
            .await
            .unwrap();
        assert_eq!(r.output, "No tasks.");
    }

    #[tokio::test]
    async fn bad_arguments() {
        let tool = TaskTool::new();
        assert!(tool.execute(json!({"action": "add"})).await.is_err());
        assert!(tool.execute(json!({"action": "complete"})).await.is_err());
        assert!(tool.execute(json!({"action": "frobnicate"})).await.is_err());
    }
}
