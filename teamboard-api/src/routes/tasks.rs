/// Task endpoints
///
/// Task visibility inherits from the parent project intersected with the
/// task's own privacy flag, which is always enforced (fail closed): on
/// single gets, on mutations, and on listings. Standalone tasks (no project)
/// are visible only to the creator, assignees, and admins.
///
/// # Endpoints
///
/// - `GET    /v1/tasks` - List visible tasks (filters: project_id, status, assignee)
/// - `POST   /v1/tasks` - Create task
/// - `GET    /v1/tasks/:id` - Get task
/// - `PUT    /v1/tasks/:id` - Update task
/// - `DELETE /v1/tasks/:id` - Delete task
/// - `PUT    /v1/tasks/:id/status` - Update board status
/// - `PUT    /v1/tasks/:id/progress` - Update progress
/// - `POST   /v1/tasks/:id/assign` - Assign a user

use crate::{
    app::AppState,
    error::{validation_error, ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use teamboard_shared::{
    models::{
        project::Project,
        task::{CreateTask, Task, TaskQuery, TaskStatus, UpdateTask},
        user::User,
        Priority,
    },
    policy::{self, Principal, PolicyError, ProjectAccess, ProjectOp, TaskOp},
};
use uuid::Uuid;
use validator::Validate;

/// Query parameters for task listing
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    /// Only tasks of this project
    pub project_id: Option<Uuid>,

    /// Only tasks with this status
    pub status: Option<TaskStatus>,

    /// Only tasks assigned to this user
    pub assignee: Option<Uuid>,
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Task title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Parent project, if any
    pub project_id: Option<Uuid>,

    /// Initial assignees
    #[serde(default)]
    pub assignees: Vec<Uuid>,

    /// Privacy flag; absent means public within its project
    #[serde(default)]
    pub is_private: bool,

    /// Board status
    pub status: Option<TaskStatus>,

    /// Priority
    pub priority: Option<Priority>,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,
}

/// Update task request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// New title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New privacy flag
    pub is_private: Option<bool>,

    /// New status
    pub status: Option<TaskStatus>,

    /// New priority
    pub priority: Option<Priority>,

    /// New progress, 0..=100
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<i32>,

    /// New due date
    pub due_date: Option<DateTime<Utc>>,
}

/// Status update request
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// New board status
    pub status: TaskStatus,
}

/// Progress update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProgressRequest {
    /// New progress, 0..=100
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: i32,
}

/// Assign request
#[derive(Debug, Deserialize)]
pub struct AssignTaskRequest {
    /// User to assign
    pub user_id: Uuid,
}

/// Loads the parent project snapshot for a task, if it has one
async fn load_parent(
    state: &AppState,
    task: &Task,
) -> Result<Option<ProjectAccess>, sqlx::Error> {
    match task.project_id {
        Some(project_id) => Ok(Project::find_by_id(&state.db, project_id)
            .await?
            .map(|p| p.access())),
        None => Ok(None),
    }
}

/// List tasks visible to the principal
///
/// Optional query filters narrow within the visible set, never beyond it.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    policy::ensure_active(&principal)?;

    let filter = policy::task_filter(&principal);
    let tasks = Task::list_visible(
        &state.db,
        &filter,
        &TaskQuery {
            project_id: query.project_id,
            status: query.status,
            assignee: query.assignee,
        },
    )
    .await?;

    Ok(Json(tasks))
}

/// Get a single task
///
/// # Errors
///
/// - `404 Not Found`: id does not resolve
/// - `403 Forbidden`: task exists but is not visible to the principal
pub async fn get_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    let parent = load_parent(&state, &task).await?;
    policy::check_task(&principal, &task.access(), parent.as_ref(), TaskOp::View)?;

    Ok(Json(task))
}

/// Create a new task
///
/// A task attached to a project requires visibility of that project; an
/// unresolvable project id is a validation error, not a silent standalone
/// task.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate().map_err(validation_error)?;
    policy::ensure_active(&principal)?;

    if let Some(project_id) = req.project_id {
        let project = Project::find_by_id(&state.db, project_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

        policy::check_project(&principal, &project.access(), ProjectOp::View)?;
    }

    for assignee in &req.assignees {
        if User::find_by_id(&state.db, *assignee).await?.is_none() {
            return Err(ApiError::NotFound("Assignee not found".to_string()));
        }
    }

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title,
            description: req.description,
            project_id: req.project_id,
            assignees: req.assignees,
            is_private: req.is_private,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
        },
        principal.id,
    )
    .await?;

    Ok(Json(task))
}

/// Update a task
///
/// Open to admins, the creator, assignees, and the parent project's owner.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate().map_err(validation_error)?;

    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    let parent = load_parent(&state, &task).await?;
    policy::check_task(&principal, &task.access(), parent.as_ref(), TaskOp::Update)?;

    let updated = Task::update(
        &state.db,
        id,
        UpdateTask {
            title: req.title,
            description: req.description.map(Some),
            is_private: req.is_private,
            status: req.status,
            priority: req.priority,
            progress: req.progress,
            due_date: req.due_date.map(Some),
        },
    )
    .await?
    .ok_or(PolicyError::NotFound)?;

    Ok(Json(updated))
}

/// Delete a task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    let parent = load_parent(&state, &task).await?;
    policy::check_task(&principal, &task.access(), parent.as_ref(), TaskOp::Delete)?;

    Task::delete(&state.db, id).await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Update board status (drag-and-drop)
pub async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    let parent = load_parent(&state, &task).await?;
    policy::check_task(&principal, &task.access(), parent.as_ref(), TaskOp::Update)?;

    let updated = Task::set_status(&state.db, id, req.status)
        .await?
        .ok_or(PolicyError::NotFound)?;

    Ok(Json(updated))
}

/// Update progress percentage
pub async fn update_progress(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProgressRequest>,
) -> ApiResult<Json<Task>> {
    req.validate().map_err(validation_error)?;

    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    let parent = load_parent(&state, &task).await?;
    policy::check_task(&principal, &task.access(), parent.as_ref(), TaskOp::Update)?;

    let updated = Task::set_progress(&state.db, id, req.progress)
        .await?
        .ok_or(PolicyError::NotFound)?;

    Ok(Json(updated))
}

/// Assign a user to a task
///
/// Assigning an already-assigned user is a no-op.
///
/// # Errors
///
/// - `404 Not Found`: task or user id does not resolve
/// - `403 Forbidden`: caller may not modify the task
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    let parent = load_parent(&state, &task).await?;
    policy::check_task(&principal, &task.access(), parent.as_ref(), TaskOp::Update)?;

    if User::find_by_id(&state.db, req.user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Task::add_assignee(&state.db, id, req.user_id).await?;

    let updated = Task::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    Ok(Json(updated))
}
