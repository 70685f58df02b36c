//! CompleteTask tool - signal task completion

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::{Tool, ToolContext, ToolMethod, ToolResult};

/// CompleteTask tool - signal that the current task is complete
pub struct CompleteTaskTool;

#[async_trait]
impl Tool for CompleteTaskTool {
    fn tool_id(&self) -> &'static str {
        "SystemCompleteTask"
    }

    fn methods(&self) -> Vec<ToolMethod> {
        vec![ToolMethod::new(
            "task_complete",
            "Signal that the current task is complete. Use when validation passes and work is done.",
            json!({
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "Brief summary of what was accomplished"
                    },
                    "artifacts": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of files created or modified"
                    }
                },
                "required": ["summary"]
            }),
        )]
    }

    async fn call(&self, _method_name: &str, input: Value, ctx: &ToolContext) -> ToolResult {
        let summary = match input.get("summary").and_then(|v| v.as_str()) {
            Some(s) => s,
            None => return ToolResult::error("Missing required parameter: summary"),
        };

        let artifacts: Vec<String> = input
            .get("artifacts")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        // Log the completion (for debugging/tracing)
        tracing::info!(
            exec_id = %ctx.exec_id,
            summary = %summary,
            artifacts = ?artifacts,
            "Task completion signaled"
        );

        // Build a success message
        let mut message = format!("Task completed: {}", summary);

        if !artifacts.is_empty() {
            message.push_str("\n\nArtifacts:\n");
            for artifact in &artifacts {
                message.push_str(&format!("  - {}\n", artifact));
            }
        }

        ToolResult::success(message)
    }
}
