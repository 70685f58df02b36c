//! Tool error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during tool execution
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Path {path} escapes worktree {worktree}")]
    SandboxViolation { path: PathBuf, worktree: PathBuf },

    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Must read file before editing: {path}")]
    EditWithoutRead { path: String },

    #[error("Command timed out after {timeout_ms}ms")]
    CommandTimeout { timeout_ms: u64 },

    #[error("Tool not found: {name}")]
    UnknownTool { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("String pattern '{pattern}' not found in file")]
    PatternNotFound { pattern: String },

    #[error("String pattern found {count} times, expected 1 (use replace_all=true for multiple)")]
    PatternNotUnique { count: usize },
}

impl ToolError {
    /// Whether the plan executor should treat this as a fatal failure of the
    /// owning subtask, as opposed to one that a retry strategy above it might
    /// recover from. Sandbox violations and unknown tools/methods indicate a
    /// bad invocation rather than a transient condition, so both are fatal;
    /// everything else is surfaced as a `ToolFailed` event but left to the
    /// caller's own retry policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ToolError::SandboxViolation { .. } | ToolError::UnknownTool { .. } | ToolError::EditWithoutRead { .. }
        )
    }
}
