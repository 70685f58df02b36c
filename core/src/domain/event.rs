//! `ToolInvocation` and `Event` - the transient types that flow out of the
//! orchestrator and response processor.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Status of a single tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Started,
    Completed,
    Failed,
}

/// A single call to a tool method with a concrete parameter map. Not persisted
/// as its own entity - callers that want a durable record embed it in a
/// Task's `artifacts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub invocation_id: String,
    pub tool_id: String,
    pub method_name: String,
    pub params: HashMap<String, serde_json::Value>,
    pub status: InvocationStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub start_time: i64,
    pub end_time: Option<i64>,
}

impl ToolInvocation {
    pub fn started(invocation_id: String, tool_id: String, method_name: String, params: HashMap<String, serde_json::Value>) -> Self {
        Self {
            invocation_id,
            tool_id,
            method_name,
            params,
            status: InvocationStatus::Started,
            result: None,
            error: None,
            start_time: taskstore::now_ms(),
            end_time: None,
        }
    }

    pub fn complete(mut self, result: serde_json::Value) -> Self {
        self.status = InvocationStatus::Completed;
        self.result = Some(result);
        self.end_time = Some(taskstore::now_ms());
        self
    }

    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = InvocationStatus::Failed;
        self.error = Some(error.into());
        self.end_time = Some(taskstore::now_ms());
        self
    }
}

/// A tagged item in the lazy sequence yielded by the response processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    AssistantText {
        content: String,
        #[serde(rename = "final")]
        is_final: bool,
    },
    ToolStarted {
        invocation_id: String,
        tool_id: String,
        method_name: String,
        params: HashMap<String, serde_json::Value>,
    },
    ToolCompleted {
        invocation_id: String,
        result: serde_json::Value,
    },
    ToolFailed {
        invocation_id: String,
        error: String,
    },
    PlanStatus {
        task_id: String,
        status: String,
        message: String,
    },
    Finish {
        reason: String,
    },
}

impl Event {
    /// The `invocationId` this event references, if any. Used by tests and by
    /// the plan executor to correlate `ToolStarted`/`ToolCompleted`/`ToolFailed`
    /// triples.
    pub fn invocation_id(&self) -> Option<&str> {
        match self {
            Event::ToolStarted { invocation_id, .. }
            | Event::ToolCompleted { invocation_id, .. }
            | Event::ToolFailed { invocation_id, .. } => Some(invocation_id),
            _ => None,
        }
    }
}
