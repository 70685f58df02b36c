//! HTTP surface - axum routes over the state manager, planner and executor.
//!
//! # Routes
//!
//! | Method | Path           | Does                                         |
//! |--------|----------------|-----------------------------------------------|
//! | POST   | /tasks/plan    | plan a description, then execute it in the background |
//! | POST   | /tasks         | create a task directly, unplanned             |
//! | GET    | /tasks         | list tasks, optionally filtered by `?status=`  |
//! | GET    | /tasks/{id}    | fetch one task                                |
//! | PUT    | /tasks/{id}    | apply a partial update                        |
//! | DELETE | /tasks/{id}    | delete a task                                 |
//! | GET    | /health        | liveness probe                                |

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::{Task, TaskCreate, TaskStatus, TaskUpdate};
use crate::executor::PlanExecutor;
use crate::planning::TaskPlanner;
use crate::state::{StateError, StateManager};

/// Shared handles every route needs. Cheap to clone - `StateManager` is
/// already a lightweight actor handle, and everything else is behind an
/// `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub state: StateManager,
    pub planner: Arc<TaskPlanner>,
    pub executor: Arc<PlanExecutor>,
    /// One cancellation token per in-flight main task, so a future cancel
    /// endpoint (or a shutdown) can stop a running plan.
    pub cancellations: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl AppState {
    pub fn new(state: StateManager, planner: Arc<TaskPlanner>, executor: Arc<PlanExecutor>) -> Self {
        Self { state, planner, executor, cancellations: Arc::new(Mutex::new(HashMap::new())) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks/plan", post(plan_task))
        .route("/tasks", post(create_task).get(list_tasks))
        .route("/tasks/{id}", get(get_task).put(update_task).delete(delete_task))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[derive(Debug, Deserialize)]
struct PlanRequest {
    description: String,
}

async fn plan_task(State(state): State<AppState>, Json(req): Json<PlanRequest>) -> Result<Json<Task>, ApiError> {
    let main_task = state.planner.plan_task(&req.description).await?;

    if main_task.status == TaskStatus::Planned {
        let cancel = CancellationToken::new();
        state.cancellations.lock().await.insert(main_task.id.clone(), cancel.clone());

        let executor = state.executor.clone();
        let task_id = main_task.id.clone();
        tokio::spawn(async move {
            if let Err(err) = executor.execute(&task_id, cancel).await {
                error!(task_id = %task_id, %err, "plan execution failed to run to completion");
            }
        });
        info!(task_id = %main_task.id, "plan accepted, execution started in the background");
    }

    Ok(Json(main_task))
}

#[derive(Debug, Deserialize)]
struct CreateTaskRequest {
    name: String,
    description: Option<String>,
    #[serde(rename = "parentId")]
    parent_id: Option<String>,
    #[serde(rename = "assignedTools", default)]
    assigned_tools: HashSet<String>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

async fn create_task(State(state): State<AppState>, Json(req): Json<CreateTaskRequest>) -> Result<Json<Task>, ApiError> {
    let mut create = TaskCreate::new(req.name).with_assigned_tools(req.assigned_tools);
    if let Some(description) = req.description {
        create = create.with_description(description);
    }
    if let Some(parent_id) = &req.parent_id {
        create = create.with_parent(parent_id.clone());
    }
    create.metadata = req.metadata;

    let task = if let Some(parent_id) = req.parent_id {
        state.state.add_subtask(&parent_id, create).await?
    } else {
        state.state.create_task(create).await?
    };

    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
struct ListTasksQuery {
    status: Option<String>,
}

async fn list_tasks(State(state): State<AppState>, Query(query): Query<ListTasksQuery>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = match query.status {
        Some(status) => {
            let status = parse_status(&status)?;
            state.state.get_tasks_by_status(status).await?
        }
        None => state.state.get_all_tasks().await?,
    };
    Ok(Json(tasks))
}

async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Task>, ApiError> {
    let task = state.state.get_task(&id).await?.ok_or_else(|| ApiError::NotFound(id.clone()))?;
    Ok(Json(task))
}

#[derive(Debug, Default, Deserialize)]
struct UpdateTaskRequest {
    name: Option<String>,
    description: Option<Option<String>>,
    status: Option<String>,
    progress: Option<f64>,
    error: Option<Option<String>>,
    result: Option<Option<Value>>,
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let status = req.status.as_deref().map(parse_status).transpose()?;

    let update = TaskUpdate {
        name: req.name,
        description: req.description,
        status,
        progress: req.progress,
        error: req.error,
        result: req.result,
        ..Default::default()
    };

    let task = state.state.update_task(&id, update).await?;
    Ok(Json(task))
}

async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    state.state.delete_task(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_status(s: &str) -> Result<TaskStatus, ApiError> {
    match s {
        "pending" => Ok(TaskStatus::Pending),
        "pending_planning" => Ok(TaskStatus::PendingPlanning),
        "planned" => Ok(TaskStatus::Planned),
        "running" => Ok(TaskStatus::Running),
        "completed" => Ok(TaskStatus::Completed),
        "failed" => Ok(TaskStatus::Failed),
        "cancelled" => Ok(TaskStatus::Cancelled),
        "planning_failed" => Ok(TaskStatus::PlanningFailed),
        other => Err(ApiError::BadRequest(format!("unknown status '{other}'"))),
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<StateError> for ApiError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(id) => ApiError::NotFound(id),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<crate::planning::PlanError> for ApiError {
    fn from(err: crate::planning::PlanError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            ApiError::NotFound(id) => (StatusCode::NOT_FOUND, format!("task '{id}' not found")),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (code, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::notify::InMemoryNotificationChannel;
    use crate::tools::ToolExecutor;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::tempdir;
    use tower::ServiceExt;

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();
        let tools = Arc::new(ToolExecutor::standard());
        let llm = Arc::new(MockLlmClient::new(vec![]));
        let planner = Arc::new(TaskPlanner::new(llm, state.clone(), tools.clone()));
        let notify = Arc::new(InMemoryNotificationChannel::new());
        let executor = Arc::new(PlanExecutor::new(state.clone(), tools, notify, temp.path().to_path_buf()));
        (AppState::new(state, planner, executor), temp)
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let (state, _temp) = test_state().await;
        let app = router(state);

        let response =
            app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_then_get_task() {
        let (state, _temp) = test_state().await;
        let app = router(state);

        let create_body = serde_json::json!({"name": "do the thing"}).to_string();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tasks")
                    .header("content-type", "application/json")
                    .body(Body::from(create_body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let created: Task = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(created.name, "do the thing");

        let response = app
            .oneshot(Request::builder().uri(format!("/tasks/{}", created.id)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_unknown_task_is_404() {
        let (state, _temp) = test_state().await;
        let app = router(state);

        let response =
            app.oneshot(Request::builder().uri("/tasks/nope").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
