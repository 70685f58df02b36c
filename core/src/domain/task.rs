//! The Task entity - the central unit of work tracked by the state manager.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use taskstore::{now_ms, IndexValue, Record};

use super::id::generate_id;

/// Lifecycle status of a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    PendingPlanning,
    Planned,
    Running,
    Completed,
    Failed,
    Cancelled,
    PlanningFailed,
}

impl TaskStatus {
    /// Terminal statuses are `completed`, `failed`, `cancelled` - the set that
    /// governs `endTime`. `planning_failed` is a distinct failure of the main
    /// task before a plan ever existed and is intentionally excluded: it does
    /// not stamp `endTime`. Callers that ask "is this task done running"
    /// should use [`Task::is_terminal`] instead, which does include it.
    pub fn sets_end_time(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::PendingPlanning => "pending_planning",
            TaskStatus::Planned => "planned",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::PlanningFailed => "planning_failed",
        };
        write!(f, "{s}")
    }
}

/// The central entity: a unit of work with lifecycle state, optionally nested
/// under a parent task, optionally depending on sibling tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub progress: f64,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub parent_id: Option<String>,
    pub subtasks: Vec<String>,
    pub dependencies: HashSet<String>,
    pub assigned_tools: HashSet<String>,
    pub artifacts: Vec<serde_json::Value>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub error: Option<String>,
    pub result: Option<serde_json::Value>,
}

/// Fields accepted by `createTask`/`addSubtask`.
#[derive(Debug, Clone, Default)]
pub struct TaskCreate {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub dependencies: HashSet<String>,
    pub assigned_tools: HashSet<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub status: Option<TaskStatus>,
    pub progress: Option<f64>,
}

impl TaskCreate {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_assigned_tools(mut self, tools: impl IntoIterator<Item = String>) -> Self {
        self.assigned_tools = tools.into_iter().collect();
        self
    }
}

/// A partial update, as accepted by `updateTask`. `None` fields are left untouched;
/// `subtasks`/`dependencies` are full replacements when present, matching the
/// "updating subtasks must preserve bidirectional consistency" contract, which
/// the state manager enforces around calls to this type.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub progress: Option<f64>,
    pub subtasks: Option<Vec<String>>,
    pub dependencies: Option<HashSet<String>>,
    pub assigned_tools: Option<HashSet<String>>,
    pub artifacts: Option<Vec<serde_json::Value>>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    pub error: Option<Option<String>>,
    pub result: Option<Option<serde_json::Value>>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }
}

impl Task {
    pub fn new(create: TaskCreate) -> Self {
        let now = now_ms();
        let status = create.status.unwrap_or(TaskStatus::Pending);
        Self {
            id: generate_id("task", &create.name),
            name: create.name,
            description: create.description,
            status,
            progress: create.progress.unwrap_or(0.0),
            start_time: now,
            end_time: None,
            parent_id: create.parent_id,
            subtasks: Vec::new(),
            dependencies: create.dependencies,
            assigned_tools: create.assigned_tools,
            artifacts: Vec::new(),
            metadata: create.metadata,
            error: None,
            result: None,
        }
    }

    /// Apply an update in place. Stamps `end_time` the moment `status`
    /// transitions into a terminal state, and never un-sets it afterward.
    pub fn apply_update(&mut self, update: TaskUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(status) = update.status {
            self.status = status;
            if status.sets_end_time() && self.end_time.is_none() {
                self.end_time = Some(now_ms());
            }
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(subtasks) = update.subtasks {
            self.subtasks = subtasks;
        }
        if let Some(dependencies) = update.dependencies {
            self.dependencies = dependencies;
        }
        if let Some(assigned_tools) = update.assigned_tools {
            self.assigned_tools = assigned_tools;
        }
        if let Some(artifacts) = update.artifacts {
            self.artifacts = artifacts;
        }
        if let Some(metadata) = update.metadata {
            self.metadata = metadata;
        }
        if let Some(error) = update.error {
            self.error = error;
        }
        if let Some(result) = update.result {
            self.result = result;
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::PlanningFailed
        )
    }

    pub fn is_terminal_successful(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

impl Record for Task {
    fn collection() -> &'static str {
        "tasks"
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn updated_at(&self) -> i64 {
        self.end_time.unwrap_or(self.start_time)
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), self.status.to_string().into());
        fields.insert("parentId".to_string(), self.parent_id.clone().into());
        fields
    }
}
