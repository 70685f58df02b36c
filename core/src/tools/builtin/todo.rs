//! todo tool - task list management for agents

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::tools::{Tool, ToolContext, ToolMethod, ToolResult};

/// Task status in the todo list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl std::fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TodoStatus::Pending => write!(f, "pending"),
            TodoStatus::InProgress => write!(f, "in_progress"),
            TodoStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A single todo item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: usize,
    pub task: String,
    pub status: TodoStatus,
    pub created_at: i64,
}

/// Shared todo list state
pub type TodoList = Arc<Mutex<Vec<TodoItem>>>;

/// Create a new shared todo list
pub fn new_todo_list() -> TodoList {
    Arc::new(Mutex::new(Vec::new()))
}

/// Manage a task list, exposed as one method per action
pub struct TodoTool {
    todos: TodoList,
}

impl TodoTool {
    /// Create a new TodoTool with its own todo list
    pub fn new() -> Self {
        Self { todos: new_todo_list() }
    }

    /// Create a TodoTool with a shared todo list
    pub fn with_list(todos: TodoList) -> Self {
        Self { todos }
    }

    async fn add(&self, input: &Value) -> ToolResult {
        let task = match input["task"].as_str() {
            Some(t) => t,
            None => return ToolResult::error("task is required"),
        };

        let mut todos = self.todos.lock().await;
        let id = todos.len() + 1;
        let item = TodoItem {
            id,
            task: task.to_string(),
            status: TodoStatus::Pending,
            created_at: taskstore::now_ms(),
        };
        todos.push(item);

        ToolResult::success(format!("Added task #{}: {}", id, task))
    }

    async fn complete(&self, input: &Value) -> ToolResult {
        let task_id = match parse_task_id(input) {
            Ok(id) => id,
            Err(e) => return e,
        };

        let mut todos = self.todos.lock().await;
        if let Some(item) = todos.iter_mut().find(|t| t.id == task_id) {
            item.status = TodoStatus::Completed;
            ToolResult::success(format!("Completed task #{}: {}", task_id, item.task))
        } else {
            ToolResult::error(format!("Task #{} not found", task_id))
        }
    }

    async fn set_status(&self, input: &Value) -> ToolResult {
        let task_id = match parse_task_id(input) {
            Ok(id) => id,
            Err(e) => return e,
        };

        let status = match input["status"].as_str() {
            Some("pending") => TodoStatus::Pending,
            Some("in_progress") => TodoStatus::InProgress,
            Some("completed") => TodoStatus::Completed,
            Some(s) => return ToolResult::error(format!("Invalid status: {}", s)),
            None => return ToolResult::error("status is required"),
        };

        let mut todos = self.todos.lock().await;
        if let Some(item) = todos.iter_mut().find(|t| t.id == task_id) {
            item.status = status.clone();
            ToolResult::success(format!("Set task #{} status to {}", task_id, status))
        } else {
            ToolResult::error(format!("Task #{} not found", task_id))
        }
    }

    async fn list(&self) -> ToolResult {
        let todos = self.todos.lock().await;
        if todos.is_empty() {
            return ToolResult::success("No tasks in the list");
        }

        let output: Vec<String> = todos
            .iter()
            .map(|t| {
                let status_marker = match t.status {
                    TodoStatus::Pending => "[ ]",
                    TodoStatus::InProgress => "[~]",
                    TodoStatus::Completed => "[x]",
                };
                format!("{} #{}: {}", status_marker, t.id, t.task)
            })
            .collect();

        ToolResult::success(output.join("\n"))
    }

    async fn clear(&self) -> ToolResult {
        let mut todos = self.todos.lock().await;
        let count = todos.len();
        todos.clear();
        ToolResult::success(format!("Cleared {} task(s)", count))
    }
}

fn parse_task_id(input: &Value) -> Result<usize, ToolResult> {
    match input["task"].as_str() {
        Some(t) => t.parse::<usize>().map_err(|_| ToolResult::error("task must be a valid task ID number")),
        None => Err(ToolResult::error("task (ID) is required")),
    }
}

impl Default for TodoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for TodoTool {
    fn tool_id(&self) -> &'static str {
        "Todo"
    }

    fn methods(&self) -> Vec<ToolMethod> {
        vec![
            ToolMethod::new(
                "add",
                "Add a task to the list.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "task": { "type": "string", "description": "Task description" }
                    },
                    "required": ["task"]
                }),
            ),
            ToolMethod::new(
                "list",
                "List all tasks.",
                serde_json::json!({ "type": "object", "properties": {} }),
            ),
            ToolMethod::new(
                "complete",
                "Mark a task completed.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "task": { "type": "string", "description": "Task ID" }
                    },
                    "required": ["task"]
                }),
            ),
            ToolMethod::new(
                "clear",
                "Remove all tasks from the list.",
                serde_json::json!({ "type": "object", "properties": {} }),
            ),
            ToolMethod::new(
                "set_status",
                "Set a task's status explicitly.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "task": { "type": "string", "description": "Task ID" },
                        "status": {
                            "type": "string",
                            "enum": ["pending", "in_progress", "completed"],
                            "description": "New status"
                        }
                    },
                    "required": ["task", "status"]
                }),
            ),
        ]
    }

    async fn call(&self, method_name: &str, input: Value, _ctx: &ToolContext) -> ToolResult {
        match method_name {
            "add" => self.add(&input).await,
            "complete" => self.complete(&input).await,
            "set_status" => self.set_status(&input).await,
            "list" => self.list().await,
            "clear" => self.clear().await,
            other => ToolResult::error(format!("Unknown method: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_todo_add() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = TodoTool::new();

        let result = tool
            .call("add", serde_json::json!({"task": "Write tests"}), &ctx)
            .await;

        assert!(!result.is_error);
        assert!(result.content.contains("#1"));
        assert!(result.content.contains("Write tests"));
    }

    #[tokio::test]
    async fn test_todo_list() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = TodoTool::new();

        tool.call("add", serde_json::json!({"task": "Task 1"}), &ctx).await;
        tool.call("add", serde_json::json!({"task": "Task 2"}), &ctx).await;

        let result = tool.call("list", serde_json::json!({}), &ctx).await;

        assert!(!result.is_error);
        assert!(result.content.contains("Task 1"));
        assert!(result.content.contains("Task 2"));
        assert!(result.content.contains("[ ]"));
    }

    #[tokio::test]
    async fn test_todo_complete() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = TodoTool::new();

        tool.call("add", serde_json::json!({"task": "Task 1"}), &ctx).await;

        let result = tool.call("complete", serde_json::json!({"task": "1"}), &ctx).await;

        assert!(!result.is_error);
        assert!(result.content.contains("Completed"));

        let list_result = tool.call("list", serde_json::json!({}), &ctx).await;
        assert!(list_result.content.contains("[x]"));
    }

    #[tokio::test]
    async fn test_todo_set_status() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = TodoTool::new();

        tool.call("add", serde_json::json!({"task": "Task 1"}), &ctx).await;

        let result = tool
            .call("set_status", serde_json::json!({"task": "1", "status": "in_progress"}), &ctx)
            .await;

        assert!(!result.is_error);
        assert!(result.content.contains("in_progress"));

        let list_result = tool.call("list", serde_json::json!({}), &ctx).await;
        assert!(list_result.content.contains("[~]"));
    }

    #[tokio::test]
    async fn test_todo_clear() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = TodoTool::new();

        tool.call("add", serde_json::json!({"task": "Task 1"}), &ctx).await;
        tool.call("add", serde_json::json!({"task": "Task 2"}), &ctx).await;

        let result = tool.call("clear", serde_json::json!({}), &ctx).await;

        assert!(!result.is_error);
        assert!(result.content.contains("Cleared 2"));

        let list_result = tool.call("list", serde_json::json!({}), &ctx).await;
        assert!(list_result.content.contains("No tasks"));
    }

    #[tokio::test]
    async fn test_todo_complete_not_found() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = TodoTool::new();

        let result = tool.call("complete", serde_json::json!({"task": "999"}), &ctx).await;

        assert!(result.is_error);
        assert!(result.content.contains("not found"));
    }

    #[tokio::test]
    async fn test_todo_unknown_method() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = TodoTool::new();

        let result = tool.call("frobnicate", serde_json::json!({}), &ctx).await;

        assert!(result.is_error);
    }
}
