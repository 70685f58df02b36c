//! Plan Executor - walks a planned task's subtasks and dispatches each one
//! to its assigned tool.
//!
//! # Architecture
//!
//! ```text
//! planned Task → PlanExecutor → one ToolInvocation per subtask → StateManager
//! ```
//!
//! Grounded in `loop/engine.rs`'s `run_agentic_loop`: call, branch on the
//! outcome, record it, advance. The Task Planner already resolved *which*
//! tool each subtask calls and with what intent, so there's no second LLM
//! turn here - the loop is a walk over subtasks rather than a live
//! conversation, and "branch on the outcome" becomes "branch on the
//! `ToolInvocation`'s status".

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::{Event, Task, TaskStatus, ToolInvocation};
use crate::notify::NotificationChannel;
use crate::state::{StateError, StateManager};
use crate::tools::{ToolContext, ToolExecutor};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("task '{0}' has no subtasks to execute")]
    NotPlanned(String),

    #[error("subtask '{0}' has no assigned tool")]
    NoToolAssigned(String),
}

/// Walks a planned main task's subtasks in order, dispatching each one
/// through the tool registry and folding the outcome back into state.
pub struct PlanExecutor {
    state: StateManager,
    tools: Arc<ToolExecutor>,
    notify: Arc<dyn NotificationChannel>,
    workdir: PathBuf,
}

impl PlanExecutor {
    pub fn new(state: StateManager, tools: Arc<ToolExecutor>, notify: Arc<dyn NotificationChannel>, workdir: PathBuf) -> Self {
        Self { state, tools, notify, workdir }
    }

    /// Execute every subtask of `main_task_id` in order and return the main
    /// task in its final terminal state.
    ///
    /// Subtasks created by the Task Planner never carry a `dependencies`
    /// entry, so "honoring dependencies" reduces to walking `Task::subtasks`
    /// in the order the planner inserted them; a subtask's `dependencies` set
    /// is still consulted defensively in case a caller created subtasks by
    /// hand.
    pub async fn execute(&self, main_task_id: &str, cancel: CancellationToken) -> Result<Task, ExecutorError> {
        self.state.set_task_status(main_task_id, TaskStatus::Running).await?;
        self.notify.publish(main_task_id, Event::PlanStatus {
            task_id: main_task_id.to_string(),
            status: TaskStatus::Running.to_string(),
            message: "execution started".to_string(),
        });

        let subtasks = self.state.get_subtasks(main_task_id).await?;
        if subtasks.is_empty() {
            return Err(ExecutorError::NotPlanned(main_task_id.to_string()));
        }

        let ctx = ToolContext::new(self.workdir.clone(), main_task_id.to_string());
        let mut completed: HashMap<String, bool> = HashMap::new();
        let mut fatal_error: Option<String> = None;

        for subtask in &subtasks {
            if !subtask.dependencies.iter().all(|dep| completed.get(dep).copied().unwrap_or(false)) {
                warn!(task_id = %subtask.id, "skipping subtask whose dependencies never completed");
                self.state.fail_task(&subtask.id, "dependency did not complete").await?;
                completed.insert(subtask.id.clone(), false);
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(task_id = %main_task_id, "plan execution cancelled");
                    self.state.set_task_status(&subtask.id, TaskStatus::Cancelled).await?;
                    let cancelled = self.state.set_task_status(main_task_id, TaskStatus::Cancelled).await?;
                    self.notify.publish(main_task_id, Event::Finish { reason: "cancelled".to_string() });
                    return Ok(cancelled);
                }
                outcome = self.run_subtask(subtask, &ctx) => {
                    let (succeeded, fatal) = outcome?;
                    completed.insert(subtask.id.clone(), succeeded);
                    if !succeeded && fatal.is_some() {
                        fatal_error = fatal;
                        break;
                    }
                }
            }
        }

        let main_task = if let Some(error) = fatal_error {
            self.state.fail_task(main_task_id, error).await?
        } else if completed.values().all(|ok| *ok) {
            let results: Vec<Value> = subtasks
                .iter()
                .filter_map(|s| completed.get(&s.id).copied().unwrap_or(false).then(|| s.result.clone()).flatten())
                .collect();
            self.state.complete_task(main_task_id, Some(Value::Array(results))).await?
        } else {
            self.state.fail_task(main_task_id, "one or more subtasks failed").await?
        };

        self.notify.publish(main_task_id, Event::Finish { reason: main_task.status.to_string() });
        Ok(main_task)
    }

    /// Run one subtask to completion: derive its tool call, dispatch it,
    /// persist the outcome. Returns `(succeeded, fatal_error)` - `fatal_error`
    /// is `Some` only when the failure should halt the rest of the plan.
    async fn run_subtask(&self, subtask: &Task, ctx: &ToolContext) -> Result<(bool, Option<String>), ExecutorError> {
        self.state.set_task_status(&subtask.id, TaskStatus::Running).await?;

        let Some(identifier) = subtask.assigned_tools.iter().next() else {
            let err = ExecutorError::NoToolAssigned(subtask.id.clone());
            self.state.fail_task(&subtask.id, err.to_string()).await?;
            return Ok((false, None));
        };

        let Some((tool_id, method_name)) = identifier.split_once("__") else {
            let error = format!("assigned tool '{identifier}' is not a valid <toolId>__<methodName> identifier");
            self.state.fail_task(&subtask.id, error).await?;
            return Ok((false, None));
        };

        let params = self.derive_params(tool_id, method_name, subtask);
        let invocation_id = crate::domain::generate_id("inv", &subtask.id);

        self.notify.publish(&subtask.id, Event::ToolStarted {
            invocation_id: invocation_id.clone(),
            tool_id: tool_id.to_string(),
            method_name: method_name.to_string(),
            params: params.clone(),
        });

        let invocation: ToolInvocation =
            self.tools.execute_tool(invocation_id.clone(), tool_id, method_name, params, ctx).await;

        match invocation.status {
            crate::domain::InvocationStatus::Completed => {
                self.notify.publish(&subtask.id, Event::ToolCompleted {
                    invocation_id,
                    result: invocation.result.clone().unwrap_or(Value::Null),
                });
                self.state.complete_task(&subtask.id, invocation.result).await?;
                Ok((true, None))
            }
            _ => {
                let error = invocation.error.clone().unwrap_or_else(|| "tool invocation failed".to_string());
                self.notify.publish(&subtask.id, Event::ToolFailed { invocation_id, error: error.clone() });
                self.state.fail_task(&subtask.id, error.clone()).await?;

                if is_fatal(&error) { Ok((false, Some(error))) } else { Ok((false, None)) }
            }
        }
    }

    /// Build the params map for a subtask's single tool call.
    ///
    /// A subtask created by hand (or by a future, richer planner) may carry
    /// an explicit `params` object under `metadata`, passed straight through.
    /// The Task Planner itself never populates one - its subtasks carry only
    /// a `thought` - so the fallback maps that thought onto whichever input
    /// field the target method actually requires, falling back to `thought`
    /// itself when the method's schema doesn't name one.
    fn derive_params(&self, tool_id: &str, method_name: &str, subtask: &Task) -> HashMap<String, Value> {
        if let Some(Value::Object(params)) = subtask.metadata.get("params") {
            return params.clone().into_iter().collect();
        }

        let description = subtask.description.clone().unwrap_or_else(|| subtask.name.clone());
        let key = self.primary_input_field(tool_id, method_name).unwrap_or_else(|| "thought".to_string());

        let mut params = HashMap::new();
        params.insert(key, Value::String(description));
        params
    }

    fn primary_input_field(&self, tool_id: &str, method_name: &str) -> Option<String> {
        let name = format!("{tool_id}__{method_name}");
        let schema = self.tools.get_tool_schemas_for_llm().into_iter().find(|s| s.name == name)?;
        schema.parameters.get("required")?.as_array()?.first()?.as_str().map(str::to_string)
    }
}

/// The present `ToolExecutor::execute_tool` API folds every failure - unknown
/// tool, unknown method, or an in-method error - into a plain string, so the
/// richer `ToolError::is_fatal()` classification it's built from isn't
/// observable here directly. Its three fatal variants each still leave a
/// recognizable fingerprint in that string (`ToolExecutor`'s own "not found"
/// messages for an unknown tool/method, and `ToolError::SandboxViolation` /
/// `ToolError::EditWithoutRead`'s `Display` text once a tool forwards
/// `err.to_string()` into a `ToolResult::error`), so fatality is inferred
/// from those rather than threading a richer error type through the
/// registry. Everything else is a non-fatal subtask failure that leaves the
/// rest of the plan to run.
fn is_fatal(error: &str) -> bool {
    error.contains("not found") || error.contains("escapes worktree") || error.contains("Must read")
}
