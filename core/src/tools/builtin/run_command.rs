//! shell tool - execute shell commands

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolMethod, ToolResult};

/// Execute a shell command in the workspace root
pub struct RunCommandTool;

#[async_trait]
impl Tool for RunCommandTool {
    fn tool_id(&self) -> &'static str {
        "Shell"
    }

    fn methods(&self) -> Vec<ToolMethod> {
        vec![ToolMethod::new(
            "exec",
            "Execute a shell command in the workspace root. Use for git, build tools, tests.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Shell command to execute"
                    },
                    "timeout_ms": {
                        "type": "integer",
                        "description": "Timeout in milliseconds (default: 120000)"
                    }
                },
                "required": ["command"]
            }),
        )]
    }

    async fn call(&self, _method_name: &str, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "RunCommandTool::call: called");
        let command = match input["command"].as_str() {
            Some(c) => c,
            None => return ToolResult::error("command is required"),
        };

        let timeout_ms = input["timeout_ms"].as_u64().unwrap_or(120_000);

        let output = match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            tokio::process::Command::new("sh")
                .arg("-c")
                .arg(command)
                .current_dir(&ctx.worktree)
                .output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return ToolResult::error(format!("Failed to execute command: {}", e)),
            Err(_) => return ToolResult::error(format!("Command timed out after {}ms", timeout_ms)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let result = if stdout.is_empty() && !stderr.is_empty() {
            stderr.to_string()
        } else if stderr.is_empty() {
            stdout.to_string()
        } else {
            format!("{}\n\nSTDERR:\n{}", stdout, stderr)
        };

        let truncated = if result.len() > 30_000 {
            format!("{}...\n[truncated, {} chars total]", &result[..30_000], result.len())
        } else {
            result
        };

        if output.status.success() {
            ToolResult::success(truncated)
        } else {
            ToolResult::error(format!(
                "Exit code: {}\n{}",
                output.status.code().unwrap_or(-1),
                truncated
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_run_command_basic() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = RunCommandTool;

        let result = tool.call("exec", serde_json::json!({"command": "echo hello"}), &ctx).await;

        assert!(!result.is_error);
        assert!(result.content.contains("hello"));
    }

    #[tokio::test]
    async fn test_run_command_in_workspace() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = RunCommandTool;

        let result = tool.call("exec", serde_json::json!({"command": "pwd"}), &ctx).await;

        assert!(!result.is_error);
        assert!(result.content.contains(temp.path().to_str().unwrap()) || !result.content.is_empty());
    }

    #[tokio::test]
    async fn test_run_command_failure() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = RunCommandTool;

        let result = tool.call("exec", serde_json::json!({"command": "false"}), &ctx).await;

        assert!(result.is_error);
        assert!(result.content.contains("Exit code: 1"));
    }

    #[tokio::test]
    async fn test_run_command_missing_command() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = RunCommandTool;

        let result = tool.call("exec", serde_json::json!({}), &ctx).await;

        assert!(result.is_error);
        assert!(result.content.contains("command is required"));
    }

    #[tokio::test]
    async fn test_run_command_stderr() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = RunCommandTool;

        let result = tool.call("exec", serde_json::json!({"command": "echo error >&2"}), &ctx).await;

        assert!(!result.is_error);
        assert!(result.content.contains("error"));
    }
}
