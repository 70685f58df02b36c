//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{Task, TaskCreate, TaskStatus, TaskUpdate};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid dependency: {0}")]
    InvalidDependency(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
pub enum StateCommand {
    CreateTask {
        create: TaskCreate,
        reply: oneshot::Sender<StateResponse<Task>>,
    },
    AddSubtask {
        parent_id: String,
        create: TaskCreate,
        reply: oneshot::Sender<StateResponse<Task>>,
    },
    GetTask {
        id: String,
        reply: oneshot::Sender<StateResponse<Option<Task>>>,
    },
    GetSubtasks {
        parent_id: String,
        reply: oneshot::Sender<StateResponse<Vec<Task>>>,
    },
    GetTasksByStatus {
        status: TaskStatus,
        reply: oneshot::Sender<StateResponse<Vec<Task>>>,
    },
    GetAllTasks {
        reply: oneshot::Sender<StateResponse<Vec<Task>>>,
    },
    UpdateTask {
        id: String,
        update: TaskUpdate,
        reply: oneshot::Sender<StateResponse<Task>>,
    },
    DeleteTask {
        id: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    SetTaskStatus {
        id: String,
        status: TaskStatus,
        reply: oneshot::Sender<StateResponse<Task>>,
    },
    CompleteTask {
        id: String,
        result: Option<serde_json::Value>,
        reply: oneshot::Sender<StateResponse<Task>>,
    },
    FailTask {
        id: String,
        error: String,
        reply: oneshot::Sender<StateResponse<Task>>,
    },
    Subscribe {
        task_id: String,
        listener: mpsc::Sender<Task>,
        reply: oneshot::Sender<()>,
    },
    SubscribeToAll {
        listener: mpsc::Sender<Task>,
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}
