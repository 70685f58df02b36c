//! WriteFile tool - write content to a file

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolMethod, ToolResult};

/// Write content to a file
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn tool_id(&self) -> &'static str {
        "WriteFile"
    }

    fn methods(&self) -> Vec<ToolMethod> {
        vec![ToolMethod::new(
            "write",
            "Write content to a file. Creates parent directories if needed.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path relative to the workspace root"
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to write"
                    }
                },
                "required": ["path", "content"]
            }),
        )]
    }

    async fn call(&self, _method_name: &str, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "WriteFileTool::call: called");
        let path = match input["path"].as_str() {
            Some(p) => p,
            None => return ToolResult::error("path is required"),
        };

        let content = match input["content"].as_str() {
            Some(c) => c,
            None => return ToolResult::error("content is required"),
        };

        let full_path = match ctx.validate_path(Path::new(path)) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        if let Some(parent) = full_path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return ToolResult::error(format!("Failed to create directories: {}", e));
        }

        if let Err(e) = tokio::fs::write(&full_path, content).await {
            return ToolResult::error(format!("Failed to write file: {}", e));
        }

        // Track as read so EditFile can be used immediately after write
        ctx.track_read(&full_path).await;

        ToolResult::success(format!("Wrote {} bytes to {}", content.len(), path))
    }
}
