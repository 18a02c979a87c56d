/// User endpoints
///
/// Any authenticated user may list and read users (a work tracker needs the
/// roster for assignment pickers). Editing is split: users may update their
/// own profile fields, while role, department, and activation changes are
/// admin-only. Deletion is admin-only and refused while the user still owns
/// projects.
///
/// # Endpoints
///
/// - `GET    /v1/users` - List users
/// - `GET    /v1/users/me` - Current principal's record
/// - `GET    /v1/users/:id` - Get user
/// - `PUT    /v1/users/:id` - Update user
/// - `DELETE /v1/users/:id` - Delete user (admin)

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
    models::user::{Role, UpdateUser, User},
    policy::{self, Principal, PolicyError},
};
use uuid::Uuid;
use validator::Validate;

/// Query parameters for user listing
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    /// Page size (default 100)
    pub limit: Option<i64>,

    /// Page offset (default 0)
    pub offset: Option<i64>,
}

/// Update user request
///
/// Profile fields are self-serviceable; `role`, `department`, `departments`,
/// and `is_active` require an admin caller.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    /// New display name
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub full_name: Option<String>,

    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New role (admin only)
    pub role: Option<Role>,

    /// New legacy department value (admin only)
    pub department: Option<String>,

    /// New department list (admin only)
    pub departments: Option<Vec<String>>,

    /// Activate or deactivate the account (admin only)
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// True when the request touches admin-gated fields
    fn touches_privileges(&self) -> bool {
        self.role.is_some()
            || self.department.is_some()
            || self.departments.is_some()
            || self.is_active.is_some()
    }
}

/// List users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Vec<User>>> {
    policy::ensure_active(&principal)?;

    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let offset = query.offset.unwrap_or(0).max(0);

    let users = User::list(&state.db, limit, offset).await?;

    Ok(Json(users))
}

/// Current principal's own record
pub async fn get_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<User>> {
    policy::ensure_active(&principal)?;

    let user = User::find_by_id(&state.db, principal.id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    Ok(Json(user))
}

/// Get a single user
pub async fn get_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    policy::ensure_active(&principal)?;

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    Ok(Json(user))
}

/// Update a user
///
/// # Errors
///
/// - `403 Forbidden`: non-admin editing someone else, or touching
///   role/department/activation fields
/// - `404 Not Found`: user id does not resolve
pub async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    req.validate().map_err(validation_error)?;
    policy::ensure_active(&principal)?;

    let is_admin = principal.role.can_manage_users();
    let is_self = principal.id == id;

    if !is_admin && !is_self {
        return Err(PolicyError::Forbidden.into());
    }
    if !is_admin && req.touches_privileges() {
        return Err(PolicyError::Forbidden.into());
    }

    let updated = User::update(
        &state.db,
        id,
        UpdateUser {
            email: req.email,
            password_hash: None,
            full_name: req.full_name.map(Some),
            role: req.role,
            department: req.department.map(Some),
            departments: req.departments,
            is_active: req.is_active,
        },
    )
    .await?
    .ok_or(PolicyError::NotFound)?;

    Ok(Json(updated))
}

/// Delete a user (admin only)
///
/// Refused with `409 Conflict` while the user still owns projects, so no
/// project is left with a dangling owner reference.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    policy::ensure_active(&principal)?;

    if !principal.role.can_manage_users() {
        return Err(PolicyError::Forbidden.into());
    }

    if User::find_by_id(&state.db, id).await?.is_none() {
        return Err(PolicyError::NotFound.into());
    }

    if User::owns_projects(&state.db, id).await? {
        return Err(ApiError::Conflict(
            "User still owns projects; transfer ownership first".to_string(),
        ));
    }

    User::delete(&state.db, id).await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}
