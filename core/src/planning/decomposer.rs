//! Task Planner - LLM-driven decomposition of a task description into subtasks.
//!
//! Single-shot: no clarification dialogue. A task description goes in, a
//! main task plus linked subtasks come out, or the main task is marked
//! `planning_failed` if the LLM can't produce a usable plan after three
//! attempts.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{Task, TaskCreate, TaskStatus, TaskUpdate};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};
use crate::state::{StateError, StateManager};
use crate::tools::ToolExecutor;

/// Total attempts at decomposition: one initial try plus two retries,
/// matching `max_retries = 2` in the original planner.
const MAX_ATTEMPTS: usize = 3;

const MAX_SUBTASK_NAME_LEN: usize = 100;
const MAX_MAIN_NAME_CHARS: usize = 50;

/// Literal error message stamped on a `planning_failed` task when the LLM
/// never produces a usable plan.
const NO_SUBTASKS_ERROR: &str = "No subtasks generated.";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    State(#[from] StateError),
}

#[derive(Debug, Clone, Deserialize)]
struct PlanStep {
    tool_identifier: String,
    thought: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PlanResponse {
    plan: Vec<PlanStep>,
}

/// Why a single decomposition attempt didn't produce a plan. Kept distinct
/// from `PlanError` since these are retried internally and never surface to
/// `plan_task`'s caller - only the literal `NO_SUBTASKS_ERROR` does.
#[derive(Debug)]
enum AttemptFailure {
    Llm(LlmError),
    InvalidJson,
    EmptyPlan,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Llm(err) => write!(f, "llm call failed: {err}"),
            AttemptFailure::InvalidJson => write!(f, "response was not valid JSON"),
            AttemptFailure::EmptyPlan => write!(f, "response contained no plan steps"),
        }
    }
}

/// Decomposes a task description into a main task and linked subtasks.
pub struct TaskPlanner {
    llm: Arc<dyn LlmClient>,
    state: StateManager,
    tools: Arc<ToolExecutor>,
}

impl TaskPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, state: StateManager, tools: Arc<ToolExecutor>) -> Self {
        Self { llm, state, tools }
    }

    /// Plan a task description.
    ///
    /// Always returns the main task, even on planning failure - a failed
    /// decomposition is recorded as `planning_failed` status plus an `error`
    /// message on the task itself. `Err` is reserved for failures to create
    /// or update the main task record in state.
    pub async fn plan_task(&self, description: &str) -> Result<Task, PlanError> {
        let main_name = format!(
            "Main plan for: {}{}",
            truncate_chars(description, MAX_MAIN_NAME_CHARS),
            if description.chars().count() > MAX_MAIN_NAME_CHARS { "..." } else { "" }
        );

        let mut create = TaskCreate::new(main_name).with_description(format!("Overall task: {description}"));
        create.status = Some(TaskStatus::PendingPlanning);
        let main_task = self.state.create_task(create).await?;
        info!(task_id = %main_task.id, "planning started");

        let plan = match self.decompose(description).await {
            Ok(plan) => plan,
            Err(failure) => {
                warn!(task_id = %main_task.id, %failure, "plan decomposition exhausted all attempts");
                return self.fail_planning(&main_task.id, NO_SUBTASKS_ERROR).await;
            }
        };

        for step in &plan {
            let name = truncate_with_ellipsis(&step.thought, MAX_SUBTASK_NAME_LEN);
            let subtask_create = TaskCreate::new(name)
                .with_description(step.thought.clone())
                .with_assigned_tools([step.tool_identifier.clone()]);

            if let Err(err) = self.state.add_subtask(&main_task.id, subtask_create).await {
                warn!(task_id = %main_task.id, %err, "failed to create subtask, halting planning");
                return self
                    .fail_planning(&main_task.id, format!("Failed to create necessary subtask: {}", step.thought))
                    .await;
            }
        }

        let planned = self
            .state
            .update_task(
                &main_task.id,
                TaskUpdate { status: Some(TaskStatus::Planned), progress: Some(0.1), ..Default::default() },
            )
            .await?;

        info!(task_id = %planned.id, subtask_count = plan.len(), "planning completed");
        Ok(planned)
    }

    async fn fail_planning(&self, task_id: &str, error: impl Into<String>) -> Result<Task, PlanError> {
        let error = error.into();
        let failed = self
            .state
            .update_task(
                task_id,
                TaskUpdate { status: Some(TaskStatus::PlanningFailed), error: Some(Some(error)), ..Default::default() },
            )
            .await?;
        Ok(failed)
    }

    /// Attempt decomposition up to `MAX_ATTEMPTS` times, retrying on any
    /// recoverable failure (LLM error, malformed JSON, empty plan) with a
    /// corrective note appended to the system prompt.
    async fn decompose(&self, description: &str) -> Result<Vec<PlanStep>, AttemptFailure> {
        let user_message = format!("Task Description: {description}");
        let mut last_failure = AttemptFailure::EmptyPlan;

        for attempt in 0..MAX_ATTEMPTS {
            info!(attempt = attempt + 1, total = MAX_ATTEMPTS, "requesting plan decomposition");

            let request = CompletionRequest {
                system_prompt: self.build_system_prompt(attempt),
                messages: vec![Message::user(user_message.clone())],
                tools: Vec::new(),
                max_tokens: 2048,
            };

            let response = match self.llm.complete(request).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(attempt = attempt + 1, %err, "planner LLM call failed");
                    last_failure = AttemptFailure::Llm(err);
                    continue;
                }
            };

            let Some(content) = response.content.filter(|c| !c.trim().is_empty()) else {
                warn!(attempt = attempt + 1, "planner LLM returned no text content");
                last_failure = AttemptFailure::EmptyPlan;
                continue;
            };

            let cleaned = strip_code_fence(&content);
            if cleaned.is_empty() {
                last_failure = AttemptFailure::EmptyPlan;
                continue;
            }

            let parsed: PlanResponse = match serde_json::from_str(cleaned) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(attempt = attempt + 1, %err, response = %cleaned, "planner response failed to parse");
                    last_failure = AttemptFailure::InvalidJson;
                    continue;
                }
            };

            if parsed.plan.is_empty() {
                warn!(attempt = attempt + 1, "planner returned an empty plan");
                last_failure = AttemptFailure::EmptyPlan;
                continue;
            }

            return Ok(parsed.plan);
        }

        Err(last_failure)
    }

    fn build_system_prompt(&self, attempt: usize) -> String {
        let schemas = self.tools.get_tool_schemas_for_llm();
        let available_tools = if schemas.is_empty() {
            "No tools available. Use 'SystemCompleteTask__task_complete' for simple tasks.".to_string()
        } else {
            serde_json::to_string(&schemas.iter().map(|s| s.name.clone()).collect::<Vec<_>>()).unwrap_or_default()
        };

        let mut prompt = format!(
            "You are an expert task planner. Decompose the given task into a sequence of subtasks \
             executable by an AI agent.\n\n\
             Always return a single JSON object with one key \"plan\", a list of subtasks. Each \
             subtask is an object with \"tool_identifier\" (string, format ToolID__methodName) and \
             \"thought\" (string, a description of the subtask).\n\n\
             Example:\n\
             {{\"plan\": [{{\"tool_identifier\": \"ReadFile__read\", \"thought\": \"Read the config file.\"}}]}}\n\n\
             Do not include any text outside the JSON object. The response must be JSON only.\n\
             Available tools (tool_identifier): {available_tools}.\n\
             If the task is simple enough to answer directly without tools, or no tool fits, return a \
             single-step plan using \"SystemCompleteTask__task_complete\" with \"thought\" containing the \
             answer or summary.\n\
             The tool_identifier you choose must exist EXACTLY in the list of available tools.\n"
        );

        if attempt > 0 {
            prompt.push_str(
                "\nYour previous response had a formatting or validation error. Strictly follow the \
                 output format: a JSON object with a single key 'plan', a list of objects, each with \
                 'tool_identifier' and 'thought'. Do not include any text outside the JSON object.\n",
            );
        }

        prompt
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn truncate_with_ellipsis(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        format!("{}...", truncate_chars(s, max_len.saturating_sub(3)))
    } else {
        s.to_string()
    }
}

fn strip_code_fence(s: &str) -> &str {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else if let Some(rest) = s.strip_prefix("```") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else {
        s
    }
}
