// Task HTTP routes
// Decision: every route, worker updates included, is scoped to the authenticated user
// Decision: every write is dispatched to the owner's open task streams

use axum::{
    extract::{FromRef, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use studio_core::{Task, TaskKind, TaskStatus};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::ListResponse;
use super::error::ApiError;
use super::sse::{resume_cursor, stream_response, StreamQuery};
use crate::auth::{AuthState, AuthUser};
use crate::services::TaskService;

/// Request to create a new task. The task starts as `pending` with progress 0.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    /// Project the task belongs to.
    pub project_id: Uuid,
    /// What the task does.
    pub kind: TaskKind,
    /// Worker input parameters.
    #[serde(default)]
    #[schema(example = json!({"template": "slideshow-classic"}))]
    pub params: Option<serde_json::Value>,
}

/// Partial task update sent by workers. Only provided fields are changed.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub kind: Option<TaskKind>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Progress percentage (0-100).
    #[serde(default)]
    #[schema(example = 42, minimum = 0, maximum = 100)]
    pub progress: Option<i32>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl UpdateTaskRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(progress) = self.progress {
            if !(0..=100).contains(&progress) {
                return Err(ApiError::bad_request(format!(
                    "progress must be between 0 and 100, got {progress}"
                )));
            }
        }
        Ok(())
    }
}

// ============================================
// App State and Routes
// ============================================

/// App state for task routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TaskService>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(service: Arc<TaskService>, auth: AuthState) -> Self {
        Self { service, auth }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(input: &AppState) -> Self {
        input.auth.clone()
    }
}

/// Create task routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/tasks/stream", get(stream_tasks))
        .route("/v1/tasks", get(list_tasks).post(create_task))
        .route("/v1/tasks/:task_id", get(get_task).patch(update_task))
        .with_state(state)
}

// ============================================
// HTTP Handlers
// ============================================

/// GET /v1/tasks/stream - Stream task updates (SSE)
///
/// Replays the caller's active tasks (or everything changed after the resume
/// cursor), then pushes every task write as it happens.
#[utoipa::path(
    get,
    path = "/v1/tasks/stream",
    params(
        ("Last-Event-ID" = Option<String>, Header, description = "Id of the last event received"),
        StreamQuery
    ),
    responses(
        (status = 200, description = "Task event stream", content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Record store unavailable")
    ),
    tag = "tasks"
)]
pub async fn stream_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
) -> Result<Response, ApiError> {
    let resume_after = resume_cursor(&headers, &query);
    let subscription = state.service.connect(user.id, resume_after).await?;
    Ok(stream_response(subscription))
}

/// POST /v1/tasks - Create a task
#[utoipa::path(
    post,
    path = "/v1/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Record store unavailable")
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.service.create_and_dispatch(user.id, req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /v1/tasks - List the caller's tasks
#[utoipa::path(
    get,
    path = "/v1/tasks",
    responses(
        (status = 200, description = "List of tasks", body = ListResponse<Task>),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Record store unavailable")
    ),
    tag = "tasks"
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ListResponse<Task>>, ApiError> {
    let tasks = state.service.list_for_owner(user.id).await?;
    Ok(Json(ListResponse::new(tasks)))
}

/// GET /v1/tasks/{task_id} - Get a task
#[utoipa::path(
    get,
    path = "/v1/tasks/{task_id}",
    params(("task_id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task found", body = Task),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks"
)]
pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = state.service.get_for_owner(task_id, user.id).await?;
    Ok(Json(task))
}

/// PATCH /v1/tasks/{task_id} - Update a task
///
/// Workers call this on behalf of the task owner. A status change also
/// creates a notification for the owner.
#[utoipa::path(
    patch,
    path = "/v1/tasks/{task_id}",
    params(("task_id" = Uuid, Path, description = "Task ID")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Task not found"),
        (status = 503, description = "Record store unavailable")
    ),
    tag = "tasks"
)]
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    req.validate()?;
    let task = state
        .service
        .update_and_dispatch(task_id, user.id, req)
        .await?;
    Ok(Json(task))
}
