/// Project model and database operations
///
/// Projects are the central grouping entity: owned by exactly one user,
/// shared with a member set, optionally tagged with a department, and
/// optionally private. Membership lives in the `project_members` join table
/// and is mutated with field-level additive updates (`INSERT .. ON CONFLICT
/// DO NOTHING`, targeted `DELETE`) so concurrent additions cannot lose
/// updates the way a whole-row replace would.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_status AS ENUM (
///     'planning', 'in_progress', 'on_hold', 'completed', 'cancelled'
/// );
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     owner UUID NOT NULL REFERENCES users(id),
///     department VARCHAR(120),
///     is_private BOOLEAN NOT NULL DEFAULT FALSE,
///     status project_status NOT NULL DEFAULT 'planning',
///     priority priority NOT NULL DEFAULT 'medium',
///     favorite BOOLEAN NOT NULL DEFAULT FALSE,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::models::project::{CreateProject, Project};
/// use teamboard_shared::policy::ProjectFilter;
/// use teamboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let owner = Uuid::new_v4();
///
/// let project = Project::create(&pool, CreateProject {
///     name: "Website relaunch".to_string(),
///     description: None,
///     owner,
///     department: Some("Marketing".to_string()),
///     is_private: false,
///     status: None,
///     priority: None,
/// }, owner).await?;
///
/// // Owner is a member from the start
/// assert!(project.members.contains(&owner));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::Priority;
use crate::policy::{ProjectAccess, ProjectFilter};

/// Project lifecycle status (descriptive, not policy-relevant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Planning
    }
}

/// Project model
///
/// `members` is aggregated from the `project_members` join table on every
/// read; the owner is always part of it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Project name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Owning user; always implicitly a member
    pub owner: Uuid,

    /// Member user ids (owner included)
    pub members: Vec<Uuid>,

    /// Department the project is associated with, if any
    pub department: Option<String>,

    /// Private projects are visible to owner+members+admin only
    pub is_private: bool,

    /// Lifecycle status
    pub status: ProjectStatus,

    /// Priority
    pub priority: Priority,

    /// Favorite flag
    pub favorite: bool,

    /// Creator's user id
    pub created_by: Uuid,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project
///
/// The department must already have been resolved through
/// `policy::resolve_department`; this layer stores what it is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    /// Project name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Owning user
    pub owner: Uuid,

    /// Resolved department, if any
    pub department: Option<String>,

    /// Privacy flag
    pub is_private: bool,

    /// Lifecycle status (defaults to planning)
    pub status: Option<ProjectStatus>,

    /// Priority (defaults to medium)
    pub priority: Option<Priority>,
}

/// Input for updating an existing project
///
/// All fields are optional; only non-None fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    /// New name
    pub name: Option<String>,

    /// New description (use Some(None) to clear)
    pub description: Option<Option<String>>,

    /// New owner; the new owner is added to members to keep the
    /// owner-is-a-member invariant across owner transfer
    pub owner: Option<Uuid>,

    /// New department (use Some(None) to clear)
    pub department: Option<Option<String>>,

    /// New privacy flag
    pub is_private: Option<bool>,

    /// New status
    pub status: Option<ProjectStatus>,

    /// New priority
    pub priority: Option<Priority>,
}

const PROJECT_COLUMNS: &str = "p.id, p.name, p.description, p.owner, \
     ARRAY(SELECT pm.user_id FROM project_members pm WHERE pm.project_id = p.id) AS members, \
     p.department, p.is_private, p.status, p.priority, p.favorite, \
     p.created_by, p.created_at, p.updated_at";

impl Project {
    /// Creates a new project and enrolls the owner as its first member
    ///
    /// Runs in a transaction so a project row can never exist without its
    /// owner membership row.
    pub async fn create(
        pool: &PgPool,
        data: CreateProject,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO projects (name, description, owner, department, is_private, status, priority, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.owner)
        .bind(&data.department)
        .bind(data.is_private)
        .bind(data.status.unwrap_or_default())
        .bind(data.priority.unwrap_or_default())
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO project_members (project_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(data.owner)
        .execute(&mut *tx)
        .await?;

        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = $1",
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(project)
    }

    /// Finds a project by ID, members included
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists the projects a principal may see
    ///
    /// Renders the policy filter server-side: admins get the unfiltered
    /// query; everyone else gets the disjunction of ownership, membership,
    /// and the public department gate. Must stay equivalent to
    /// `policy::can_view_project`; `ProjectFilter::matches` pins that in
    /// the policy tests.
    ///
    /// `department` optionally narrows the listing to one department.
    pub async fn list_visible(
        pool: &PgPool,
        filter: &ProjectFilter,
        department: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {PROJECT_COLUMNS} FROM projects p");
        let mut clauses: Vec<String> = Vec::new();
        let mut bind_count = 0;

        if let ProjectFilter::Restricted { .. } = filter {
            clauses.push(
                "(p.owner = $1 \
                 OR EXISTS(SELECT 1 FROM project_members pm \
                           WHERE pm.project_id = p.id AND pm.user_id = $1) \
                 OR (NOT p.is_private AND p.department = ANY($2)))"
                    .to_string(),
            );
            bind_count = 2;
        }

        if department.is_some() {
            bind_count += 1;
            clauses.push(format!("p.department = ${}", bind_count));
        }

        if !clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&clauses.join(" AND "));
        }
        query.push_str(" ORDER BY p.created_at DESC");

        let mut q = sqlx::query_as::<_, Project>(&query);

        if let ProjectFilter::Restricted {
            principal,
            departments,
        } = filter
        {
            q = q.bind(*principal).bind(departments);
        }
        if let Some(dept) = department {
            q = q.bind(dept);
        }

        let projects = q.fetch_all(pool).await?;

        Ok(projects)
    }

    /// Updates an existing project
    ///
    /// Only non-None fields are written. When the owner changes, the new
    /// owner is enrolled as a member in the same transaction.
    ///
    /// # Returns
    ///
    /// The updated project if found, None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.owner.is_some() {
            bind_count += 1;
            query.push_str(&format!(", owner = ${}", bind_count));
        }
        if data.department.is_some() {
            bind_count += 1;
            query.push_str(&format!(", department = ${}", bind_count));
        }
        if data.is_private.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_private = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 RETURNING id");

        let mut q = sqlx::query_scalar::<_, Uuid>(&query).bind(id);

        if let Some(ref name) = data.name {
            q = q.bind(name);
        }
        if let Some(ref description) = data.description {
            q = q.bind(description);
        }
        if let Some(owner) = data.owner {
            q = q.bind(owner);
        }
        if let Some(ref department) = data.department {
            q = q.bind(department);
        }
        if let Some(is_private) = data.is_private {
            q = q.bind(is_private);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }

        let updated = q.fetch_optional(&mut *tx).await?;

        let Some(id) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        // Keep the owner-is-a-member invariant across owner transfer
        if let Some(new_owner) = data.owner {
            sqlx::query(
                "INSERT INTO project_members (project_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(new_owner)
            .execute(&mut *tx)
            .await?;
        }

        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = $1",
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(project))
    }

    /// Deletes a project by ID
    ///
    /// Tasks of the project (and their assignee rows) go with it via
    /// `ON DELETE CASCADE`.
    ///
    /// # Returns
    ///
    /// True if the project was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Adds a member to a project
    ///
    /// Additive at the row level; adding an existing member is a no-op, and
    /// two concurrent adds both land.
    pub async fn add_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO project_members (project_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Removes a member from a project
    ///
    /// The owner-removal guard (`policy::check_member_removal`) must have
    /// passed before this is called.
    pub async fn remove_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Sets the favorite flag
    ///
    /// # Returns
    ///
    /// The updated project if found, None if it doesn't exist
    pub async fn set_favorite(
        pool: &PgPool,
        id: Uuid,
        favorite: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            "UPDATE projects SET favorite = $2, updated_at = NOW() WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(favorite)
        .fetch_optional(pool)
        .await?;

        match updated {
            Some(id) => Self::find_by_id(pool, id).await,
            None => Ok(None),
        }
    }

    /// Policy-relevant snapshot of this project
    pub fn access(&self) -> ProjectAccess {
        ProjectAccess {
            owner: self.owner,
            members: self.members.clone(),
            department: self.department.clone(),
            is_private: self.is_private,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_status_as_str() {
        assert_eq!(ProjectStatus::Planning.as_str(), "planning");
        assert_eq!(ProjectStatus::InProgress.as_str(), "in_progress");
        assert_eq!(ProjectStatus::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn test_project_status_default() {
        assert_eq!(ProjectStatus::default(), ProjectStatus::Planning);
    }

    #[test]
    fn test_access_snapshot() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let now = Utc::now();

        let project = Project {
            id: Uuid::new_v4(),
            name: "Relaunch".to_string(),
            description: None,
            owner,
            members: vec![owner, member],
            department: Some("Marketing".to_string()),
            is_private: true,
            status: ProjectStatus::Planning,
            priority: Priority::Medium,
            favorite: false,
            created_by: owner,
            created_at: now,
            updated_at: now,
        };

        let access = project.access();
        assert_eq!(access.owner, owner);
        assert_eq!(access.members, vec![owner, member]);
        assert_eq!(access.department.as_deref(), Some("Marketing"));
        assert!(access.is_private);
    }
}
