//! StateManager - actor that owns the TaskStore
//!
//! Processes commands via channels for thread-safe access to persistent
//! task state. The actor never awaits while mutating the map in place: it
//! owns the store exclusively within `actor_loop` and only awaits between
//! command handling, so no exclusive lock is ever held across a suspension
//! point.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::domain::{Filter, Store, Task, TaskCreate, TaskStatus, TaskUpdate};

use super::messages::{StateCommand, StateError, StateResponse};

const LISTENER_BUFFER: usize = 64;

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor, loading all tasks from storage into
    /// memory (the `initialize` step of the contract happens implicitly:
    /// indexes are rebuilt from the JSONL log before the actor starts
    /// accepting commands).
    pub fn spawn(store_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), "spawn: called");
        let store = Store::open(store_path.as_ref())?;

        let task_count = store.rebuild_indexes::<Task>()?;
        info!(task_count, "StateManager initialized, rebuilt task indexes");

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));

        Ok(Self { tx })
    }

    pub async fn create_task(&self, create: TaskCreate) -> StateResponse<Task> {
        debug!(name = %create.name, "create_task: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::CreateTask { create, reply })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn add_subtask(&self, parent_id: &str, create: TaskCreate) -> StateResponse<Task> {
        debug!(%parent_id, name = %create.name, "add_subtask: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::AddSubtask {
                parent_id: parent_id.to_string(),
                create,
                reply,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn get_task(&self, id: &str) -> StateResponse<Option<Task>> {
        debug!(%id, "get_task: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::GetTask { id: id.to_string(), reply })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn get_subtasks(&self, parent_id: &str) -> StateResponse<Vec<Task>> {
        debug!(%parent_id, "get_subtasks: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::GetSubtasks {
                parent_id: parent_id.to_string(),
                reply,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn get_tasks_by_status(&self, status: TaskStatus) -> StateResponse<Vec<Task>> {
        debug!(?status, "get_tasks_by_status: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::GetTasksByStatus { status, reply })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn get_all_tasks(&self) -> StateResponse<Vec<Task>> {
        debug!("get_all_tasks: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::GetAllTasks { reply })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn update_task(&self, id: &str, update: TaskUpdate) -> StateResponse<Task> {
        debug!(%id, "update_task: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::UpdateTask {
                id: id.to_string(),
                update,
                reply,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn delete_task(&self, id: &str) -> StateResponse<()> {
        debug!(%id, "delete_task: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::DeleteTask { id: id.to_string(), reply })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn set_task_status(&self, id: &str, status: TaskStatus) -> StateResponse<Task> {
        debug!(%id, ?status, "set_task_status: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::SetTaskStatus {
                id: id.to_string(),
                status,
                reply,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn complete_task(&self, id: &str, result: Option<serde_json::Value>) -> StateResponse<Task> {
        debug!(%id, "complete_task: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::CompleteTask {
                id: id.to_string(),
                result,
                reply,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn fail_task(&self, id: &str, error: impl Into<String>) -> StateResponse<Task> {
        let error = error.into();
        debug!(%id, %error, "fail_task: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::FailTask {
                id: id.to_string(),
                error,
                reply,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Subscribe to updates for a single task. Dropping the returned
    /// receiver unsubscribes - the actor detects the closed channel on its
    /// next broadcast and drops the listener.
    pub async fn subscribe(&self, task_id: &str) -> StateResponse<mpsc::Receiver<Task>> {
        let (listener, rx) = mpsc::channel(LISTENER_BUFFER);
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::Subscribe {
                task_id: task_id.to_string(),
                listener,
                reply,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?;
        Ok(rx)
    }

    /// Subscribe to updates for every task.
    pub async fn subscribe_to_all(&self) -> StateResponse<mpsc::Receiver<Task>> {
        let (listener, rx) = mpsc::channel(LISTENER_BUFFER);
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::SubscribeToAll { listener, reply })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?;
        Ok(rx)
    }

    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx.send(StateCommand::Shutdown).await.map_err(|_| StateError::ChannelError)
    }
}

/// Notify every listener registered for `task`, dropping any whose channel
/// is closed or full - a full channel means a slow consumer, and per the
/// documented contract a stalled listener is treated as unsubscribed rather
/// than stalling the whole actor.
fn notify(task_listeners: &mut HashMap<String, Vec<mpsc::Sender<Task>>>, global_listeners: &mut Vec<mpsc::Sender<Task>>, task: &Task) {
    if let Some(listeners) = task_listeners.get_mut(&task.id) {
        listeners.retain(|tx| match tx.try_send(task.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(task_id = %task.id, "listener channel full, dropping as unsubscribed");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        if listeners.is_empty() {
            task_listeners.remove(&task.id);
        }
    }

    global_listeners.retain(|tx| match tx.try_send(task.clone()) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("global listener channel full, dropping as unsubscribed");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    });
}

fn get_required(store: &Store, id: &str) -> StateResponse<Task> {
    store
        .load::<Task>(id)
        .map_err(|e| StateError::StoreError(e.to_string()))?
        .ok_or_else(|| StateError::NotFound(id.to_string()))
}

/// Create `create` and, if it names a `parent_id`, atomically link it into
/// that parent's `subtasks`. Validates that `create.dependencies` are
/// sibling-scoped first: other children of the same parent, or - for a
/// root task - other existing root tasks.
///
/// Returns the new task and, when a parent was touched, its updated record
/// so the caller can notify both.
fn create_task_linked(store: &mut Store, create: TaskCreate) -> StateResponse<(Task, Option<Task>)> {
    let parent = match &create.parent_id {
        Some(parent_id) => Some(get_required(store, parent_id)?),
        None => None,
    };

    let siblings: HashSet<String> = match &parent {
        Some(parent) => parent.subtasks.iter().cloned().collect(),
        None => store
            .list::<Task>(&[Filter::eq("parentId", None::<String>)])
            .map_err(|e| StateError::StoreError(e.to_string()))?
            .into_iter()
            .map(|t| t.id)
            .collect(),
    };

    if !create.dependencies.iter().all(|dep| siblings.contains(dep)) {
        return Err(StateError::InvalidDependency(format!(
            "dependencies {:?} must reference sibling tasks",
            create.dependencies
        )));
    }

    let task = Task::new(create);
    store.save(&task).map_err(|e| StateError::StoreError(e.to_string()))?;

    let parent = match parent {
        Some(mut parent) => {
            parent.subtasks.push(task.id.clone());
            store.update(&parent).map_err(|e| StateError::StoreError(e.to_string()))?;
            Some(parent)
        }
        None => None,
    };

    Ok((task, parent))
}

/// Every descendant of `task`, depth-first, not including `task` itself.
fn collect_descendants(store: &Store, task: &Task) -> StateResponse<Vec<String>> {
    let mut ids = Vec::new();
    for child_id in &task.subtasks {
        let child = get_required(store, child_id)?;
        ids.push(child.id.clone());
        ids.extend(collect_descendants(store, &child)?);
    }
    Ok(ids)
}

/// The actor loop that owns the Store and processes commands
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    let mut task_listeners: HashMap<String, Vec<mpsc::Sender<Task>>> = HashMap::new();
    let mut global_listeners: Vec<mpsc::Sender<Task>> = Vec::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::CreateTask { create, reply } => {
                let linked = create_task_linked(&mut store, create);
                if let Ok((ref task, ref parent)) = linked {
                    if let Some(parent) = parent {
                        notify(&mut task_listeners, &mut global_listeners, parent);
                    }
                    notify(&mut task_listeners, &mut global_listeners, task);
                }
                let _ = reply.send(linked.map(|(task, _)| task));
            }

            StateCommand::AddSubtask { parent_id, mut create, reply } => {
                create.parent_id = Some(parent_id);
                let linked = create_task_linked(&mut store, create);
                if let Ok((ref task, ref parent)) = linked {
                    if let Some(parent) = parent {
                        notify(&mut task_listeners, &mut global_listeners, parent);
                    }
                    notify(&mut task_listeners, &mut global_listeners, task);
                }
                let _ = reply.send(linked.map(|(task, _)| task));
            }

            StateCommand::GetTask { id, reply } => {
                let result = store.load::<Task>(&id).map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::GetSubtasks { parent_id, reply } => {
                let result = (|| -> StateResponse<Vec<Task>> {
                    let parent = get_required(&store, &parent_id)?;
                    parent
                        .subtasks
                        .iter()
                        .map(|id| get_required(&store, id))
                        .collect()
                })();
                let _ = reply.send(result);
            }

            StateCommand::GetTasksByStatus { status, reply } => {
                let filters = vec![Filter::eq("status", status.to_string())];
                let result: StateResponse<Vec<Task>> =
                    store.list(&filters).map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::GetAllTasks { reply } => {
                let result: StateResponse<Vec<Task>> =
                    store.load_all().map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::UpdateTask { id, update, reply } => {
                let result = (|| -> StateResponse<Task> {
                    let mut task = get_required(&store, &id)?;
                    task.apply_update(update);
                    store.update(&task).map_err(|e| StateError::StoreError(e.to_string()))?;
                    Ok(task)
                })();
                if let Ok(ref task) = result {
                    notify(&mut task_listeners, &mut global_listeners, task);
                }
                let _ = reply.send(result);
            }

            StateCommand::DeleteTask { id, reply } => {
                let result = (|| -> StateResponse<Option<Task>> {
                    let task = get_required(&store, &id)?;
                    let descendants = collect_descendants(&store, &task)?;

                    for descendant_id in &descendants {
                        store
                            .delete::<Task>(descendant_id)
                            .map_err(|e| StateError::StoreError(e.to_string()))?;
                        task_listeners.remove(descendant_id);
                    }
                    store.delete::<Task>(&id).map_err(|e| StateError::StoreError(e.to_string()))?;
                    task_listeners.remove(&id);

                    let Some(parent_id) = &task.parent_id else { return Ok(None) };
                    let mut parent = match get_required(&store, parent_id) {
                        Ok(parent) => parent,
                        Err(StateError::NotFound(_)) => {
                            warn!(%parent_id, task_id = %id, "deleted task's parent is already gone, skipping relink");
                            return Ok(None);
                        }
                        Err(err) => return Err(err),
                    };
                    parent.subtasks.retain(|child_id| child_id != &id);
                    store.update(&parent).map_err(|e| StateError::StoreError(e.to_string()))?;
                    Ok(Some(parent))
                })();

                if let Ok(Some(ref parent)) = result {
                    notify(&mut task_listeners, &mut global_listeners, parent);
                }
                let _ = reply.send(result.map(|_| ()));
            }

            StateCommand::SetTaskStatus { id, status, reply } => {
                let result = (|| -> StateResponse<Task> {
                    let mut task = get_required(&store, &id)?;
                    task.apply_update(crate::domain::TaskUpdate::status(status));
                    store.update(&task).map_err(|e| StateError::StoreError(e.to_string()))?;
                    Ok(task)
                })();
                if let Ok(ref task) = result {
                    notify(&mut task_listeners, &mut global_listeners, task);
                }
                let _ = reply.send(result);
            }

            StateCommand::CompleteTask { id, result: task_result, reply } => {
                let result = (|| -> StateResponse<Task> {
                    let mut task = get_required(&store, &id)?;
                    task.apply_update(crate::domain::TaskUpdate {
                        status: Some(TaskStatus::Completed),
                        result: task_result.map(Some),
                        ..Default::default()
                    });
                    store.update(&task).map_err(|e| StateError::StoreError(e.to_string()))?;
                    Ok(task)
                })();
                if let Ok(ref task) = result {
                    notify(&mut task_listeners, &mut global_listeners, task);
                }
                let _ = reply.send(result);
            }

            StateCommand::FailTask { id, error, reply } => {
                let result = (|| -> StateResponse<Task> {
                    let mut task = get_required(&store, &id)?;
                    task.apply_update(crate::domain::TaskUpdate {
                        status: Some(TaskStatus::Failed),
                        error: Some(Some(error.clone())),
                        ..Default::default()
                    });
                    store.update(&task).map_err(|e| StateError::StoreError(e.to_string()))?;
                    Ok(task)
                })();
                if let Ok(ref task) = result {
                    notify(&mut task_listeners, &mut global_listeners, task);
                }
                let _ = reply.send(result);
            }

            StateCommand::Subscribe { task_id, listener, reply } => {
                task_listeners.entry(task_id).or_default().push(listener);
                let _ = reply.send(());
            }

            StateCommand::SubscribeToAll { listener, reply } => {
                global_listeners.push(listener);
                let _ = reply.send(());
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}
