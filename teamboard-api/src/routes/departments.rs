/// Department endpoints
///
/// Departments are plain grouping keys; any authenticated user may list
/// them, while creation and deletion are admin-only.
///
/// # Endpoints
///
/// - `GET    /v1/departments` - List departments
/// - `POST   /v1/departments` - Create department (admin)
/// - `GET    /v1/departments/:id` - Get department
/// - `DELETE /v1/departments/:id` - Delete department (admin)

use crate::{
    app::AppState,
    error::{validation_error, ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use teamboard_shared::{
    models::{
        department::{CreateDepartment, Department},
        user::User,
    },
    policy::{self, Principal, PolicyError},
};
use uuid::Uuid;
use validator::Validate;

/// Create department request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDepartmentRequest {
    /// Department name
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,

    /// Optional head-of-department user
    pub head: Option<Uuid>,
}

/// List all departments
pub async fn list_departments(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<Department>>> {
    policy::ensure_active(&principal)?;

    let departments = Department::list(&state.db).await?;

    Ok(Json(departments))
}

/// Get a single department
pub async fn get_department(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Department>> {
    policy::ensure_active(&principal)?;

    let department = Department::find_by_id(&state.db, id)
        .await?
        .ok_or(PolicyError::NotFound)?;

    Ok(Json(department))
}

/// Create a department (admin only)
pub async fn create_department(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateDepartmentRequest>,
) -> ApiResult<Json<Department>> {
    req.validate().map_err(validation_error)?;
    policy::ensure_active(&principal)?;

    if !principal.role.can_manage_departments() {
        return Err(PolicyError::Forbidden.into());
    }

    if let Some(head) = req.head {
        if User::find_by_id(&state.db, head).await?.is_none() {
            return Err(ApiError::NotFound("Head user not found".to_string()));
        }
    }

    let department = Department::create(
        &state.db,
        CreateDepartment {
            name: req.name,
            head: req.head,
        },
    )
    .await?;

    Ok(Json(department))
}

/// Delete a department (admin only)
pub async fn delete_department(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    policy::ensure_active(&principal)?;

    if !principal.role.can_manage_departments() {
        return Err(PolicyError::Forbidden.into());
    }

    let deleted = Department::delete(&state.db, id).await?;
    if !deleted {
        return Err(PolicyError::NotFound.into());
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}
