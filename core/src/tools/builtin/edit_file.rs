//! edit tool - replace strings in a file

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolMethod, ToolResult};

/// Replace a specific string in a file
pub struct EditFileTool;

#[async_trait]
impl Tool for EditFileTool {
    fn tool_id(&self) -> &'static str {
        "EditFile"
    }

    fn methods(&self) -> Vec<ToolMethod> {
        vec![ToolMethod::new(
            "edit",
            "Replace a specific string in a file. Requires a prior read call.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path relative to the workspace root"
                    },
                    "old_string": {
                        "type": "string",
                        "description": "Exact string to find and replace"
                    },
                    "new_string": {
                        "type": "string",
                        "description": "Replacement string"
                    },
                    "replace_all": {
                        "type": "boolean",
                        "description": "Replace all occurrences (default: false)"
                    }
                },
                "required": ["path", "old_string", "new_string"]
            }),
        )]
    }

    async fn call(&self, _method_name: &str, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "EditFileTool::call: called");
        let path = match input["path"].as_str() {
            Some(p) => p,
            None => return ToolResult::error("path is required"),
        };

        let old_string = match input["old_string"].as_str() {
            Some(s) => s,
            None => return ToolResult::error("old_string is required"),
        };

        let new_string = match input["new_string"].as_str() {
            Some(s) => s,
            None => return ToolResult::error("new_string is required"),
        };

        let replace_all = input["replace_all"].as_bool().unwrap_or(false);

        let full_path = match ctx.validate_path(Path::new(path)) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        if !ctx.was_read(&full_path).await {
            return ToolResult::error("Must read before editing. Read the file first to see current content.");
        }

        let content = match tokio::fs::read_to_string(&full_path).await {
            Ok(c) => c,
            Err(e) => return ToolResult::error(format!("Failed to read file: {}", e)),
        };

        if !content.contains(old_string) {
            return ToolResult::error(
                "old_string not found in file. Make sure it matches exactly including whitespace.",
            );
        }

        if !replace_all {
            let count = content.matches(old_string).count();
            if count > 1 {
                return ToolResult::error(format!(
                    "old_string found {} times. Use replace_all=true or provide more context.",
                    count
                ));
            }
        }

        let replacement_count = content.matches(old_string).count();

        let new_content = if replace_all {
            content.replace(old_string, new_string)
        } else {
            content.replacen(old_string, new_string, 1)
        };

        if let Err(e) = tokio::fs::write(&full_path, &new_content).await {
            return ToolResult::error(format!("Failed to write file: {}", e));
        }

        let replacements = if replace_all { replacement_count } else { 1 };

        ToolResult::success(format!("Replaced {} occurrence(s) in {}", replacements, path))
    }
}
