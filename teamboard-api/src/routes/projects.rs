/// Project endpoints
///
/// Every handler here follows the same shape: load the resource, ask the
/// policy evaluator, then act. A missing id is 404; an existing project the
/// principal may not touch is 403. Listings are always filtered through the
/// evaluator's filter; a non-admin never receives the unfiltered collection.
///
/// # Endpoints
///
/// - `GET    /v1/projects` - List visible projects
/// - `POST   /v1/projects` - Create project
/// - `GET    /v1/projects/:id` - Get project
/// - `PUT    /v1/projects/:id` - Update project
/// - `DELETE /v1/projects/:id` - Delete project (cascades to tasks)
/// - `POST   /v1/projects/:id/members` - Add member
/// - `DELETE /v1/projects/:id/members/:user_id` - Remove member
/// - `PUT    /v1/projects/:id/favorite` - Toggle favorite

use crate::{
    app::AppState,
    error::{validation_error, ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use teamboard_shared::{
    models::{
        project::{CreateProject, Project, ProjectStatus, UpdateProject},
        user::User,
        Priority,
    },
    policy::{self, Principal, PolicyError, ProjectOp},
};
use uuid::Uuid;
use validator::Validate;

/// Query parameters for project listing
#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    /// Narrow the listing to one department
    pub department: Option<String>,
}

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    /// Project name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Department to tag the project with; when absent it is resolved from
    /// the creator's department affiliations
    pub department: Option<String>,

    /// Privacy flag
    #[serde(default)]
    pub is_private: bool,

    /// Lifecycle status
    pub status: Option<ProjectStatus>,

    /// Priority
    pub priority: Option<Priority>,
}

/// Update project request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    /// New name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New owner
    pub owner: Option<Uuid>,

    /// New department
    pub department: Option<String>,

    /// New privacy flag
    pub is_private: Option<bool>,

    /// New status
    pub status: Option<ProjectStatus>,

    /// New priority
    pub priority: Option<Priority>,
}

/// Add member request
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    /// User to enroll
    pub user_id: Uuid,
}

/// List projects visible to the principal
///
/// The filter is built from the principal snapshot loaded for this request,
/// so a department change is reflected immediately on the next call.
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListProjectsQuery>,
) -> ApiResult<Json<Vec<Project>>> {
    policy::ensure_active(&principal)?;

    let filter = policy::project_filter(&principal);
    let projects =
        Project::list_visible(&state.db, &filter, query.department.as_deref()).await?;

    Ok(Json(projects))
}

/// Get a single project
///
/// # Errors
///
/// - `404 Not Found`: id does not resolve
/// - `403 Forbidden`: project exists but is not visible to the principal
pub async fn get_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    policy::check_project(&principal, &project.access(), ProjectOp::View)?;

    Ok(Json(project))
}

/// Create a new project
///
/// The creator becomes owner and first member. The department is resolved
/// through the policy rules: explicit departments must be one the creator
/// belongs to (admins excepted); with none given, a single affiliation is
/// auto-assigned, none leaves the project personal, and several is an error.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate().map_err(validation_error)?;
    policy::ensure_active(&principal)?;

    let requested = req.department.filter(|d| !d.is_empty());
    let department = policy::resolve_department(&principal, requested)?;

    let project = Project::create(
        &state.db,
        CreateProject {
            name: req.name,
            description: req.description,
            owner: principal.id,
            department,
            is_private: req.is_private,
            status: req.status,
            priority: req.priority,
        },
        principal.id,
    )
    .await?;

    Ok(Json(project))
}

/// Update a project
///
/// Owner or admin only. An explicit department change goes through the same
/// membership validation as creation.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate().map_err(validation_error)?;

    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    policy::check_project(&principal, &project.access(), ProjectOp::Update)?;

    let department = match req.department.filter(|d| !d.is_empty()) {
        Some(dept) => policy::resolve_department(&principal, Some(dept))?.map(Some),
        None => None,
    };

    let updated = Project::update(
        &state.db,
        id,
        UpdateProject {
            name: req.name,
            description: req.description.map(Some),
            owner: req.owner,
            department,
            is_private: req.is_private,
            status: req.status,
            priority: req.priority,
        },
    )
    .await?
    .ok_or(PolicyError::NotFound)?;

    Ok(Json(updated))
}

/// Delete a project
///
/// Owner, admin, or manager. Tasks of the project are deleted with it.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    policy::check_project(&principal, &project.access(), ProjectOp::Delete)?;

    Project::delete(&state.db, id).await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Add a member to a project
///
/// Owner or admin only. Adding an existing member is a no-op.
///
/// # Errors
///
/// - `404 Not Found`: project or user id does not resolve
/// - `403 Forbidden`: caller may not manage members
pub async fn add_member(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<Json<Project>> {
    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    policy::check_project(&principal, &project.access(), ProjectOp::ManageMembers)?;

    if User::find_by_id(&state.db, req.user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Project::add_member(&state.db, id, req.user_id).await?;

    let updated = Project::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    Ok(Json(updated))
}

/// Remove a member from a project
///
/// Owner or admin only. Removing the owner is always rejected, for every
/// caller including admins.
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Project>> {
    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    policy::check_project(&principal, &project.access(), ProjectOp::ManageMembers)?;
    policy::check_member_removal(&project.access(), user_id)?;

    Project::remove_member(&state.db, id, user_id).await?;

    let updated = Project::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    Ok(Json(updated))
}

/// Toggle the favorite flag
///
/// Read-level bar: owner or member (a personal preference, not a shared
/// mutation).
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    policy::check_project(&principal, &project.access(), ProjectOp::Favorite)?;

    let updated = Project::set_favorite(&state.db, id, !project.favorite)
        .await?
        .ok_or(PolicyError::NotFound)?;

    Ok(Json(updated))
}
