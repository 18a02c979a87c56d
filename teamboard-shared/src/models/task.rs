/// Task model and database operations
///
/// Tasks optionally belong to a project (`project_id` is nullable; standalone
/// tasks are allowed) and carry an assignee set in the `task_assignees` join
/// table, mutated additively like project membership. The privacy flag is
/// always enforced by the policy layer, including on listings.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'working', 'stuck', 'review', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     project_id UUID REFERENCES projects(id) ON DELETE CASCADE,
///     assigned_by UUID NOT NULL REFERENCES users(id),
///     is_private BOOLEAN NOT NULL DEFAULT FALSE,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority priority NOT NULL DEFAULT 'medium',
///     progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
///     due_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE task_assignees (
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     PRIMARY KEY (task_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::models::task::{CreateTask, Task};
/// use teamboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, CreateTask {
///     title: "Draft landing page".to_string(),
///     description: None,
///     project_id: None,
///     assignees: vec![Uuid::new_v4()],
///     is_private: false,
///     status: None,
///     priority: None,
///     due_date: None,
/// }, Uuid::new_v4()).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::Priority;
use crate::policy::{TaskAccess, TaskFilter};

/// Task board status (descriptive, not policy-relevant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Working,
    Stuck,
    Review,
    Done,
}

impl TaskStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Working => "working",
            TaskStatus::Stuck => "stuck",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "working" => Ok(TaskStatus::Working),
            "stuck" => Ok(TaskStatus::Stuck),
            "review" => Ok(TaskStatus::Review),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("Unknown task status '{}'", other)),
        }
    }
}

/// Task model
///
/// `assignees` is aggregated from the `task_assignees` join table on every
/// read.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Parent project, if any; standalone tasks have none
    pub project_id: Option<Uuid>,

    /// Creator's user id
    pub assigned_by: Uuid,

    /// Assigned user ids
    pub assignees: Vec<Uuid>,

    /// Private tasks are visible to assignees+creator+admin only
    pub is_private: bool,

    /// Board status
    pub status: TaskStatus,

    /// Priority
    pub priority: Priority,

    /// Completion percentage, 0..=100
    pub progress: i32,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Task title
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

    /// Board status (defaults to todo)
    pub status: Option<TaskStatus>,

    /// Priority (defaults to medium)
    pub priority: Option<Priority>,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,
}

/// Input for updating an existing task
///
/// All fields are optional; only non-None fields are written. Assignees are
/// managed through `Task::add_assignee` / `Task::remove_assignee`, not here,
/// so concurrent assignment changes stay additive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    /// New title
    pub title: Option<String>,

    /// New description (use Some(None) to clear)
    pub description: Option<Option<String>>,

    /// New privacy flag
    pub is_private: Option<bool>,

    /// New status
    pub status: Option<TaskStatus>,

    /// New priority
    pub priority: Option<Priority>,

    /// New progress, 0..=100
    pub progress: Option<i32>,

    /// New due date (use Some(None) to clear)
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Optional query filters for task listings, on top of the policy filter
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    /// Only tasks of this project
    pub project_id: Option<Uuid>,

    /// Only tasks with this status
    pub status: Option<TaskStatus>,

    /// Only tasks assigned to this user
    pub assignee: Option<Uuid>,
}

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.project_id, t.assigned_by, \
     ARRAY(SELECT ta.user_id FROM task_assignees ta WHERE ta.task_id = t.id) AS assignees, \
     t.is_private, t.status, t.priority, t.progress, t.due_date, t.created_at, t.updated_at";

impl Task {
    /// Creates a new task with its initial assignees
    ///
    /// Runs in a transaction so the task row and its assignee rows appear
    /// together.
    pub async fn create(
        pool: &PgPool,
        data: CreateTask,
        assigned_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO tasks (title, description, project_id, assigned_by, is_private, status, priority, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.project_id)
        .bind(assigned_by)
        .bind(data.is_private)
        .bind(data.status.unwrap_or_default())
        .bind(data.priority.unwrap_or_default())
        .bind(data.due_date)
        .fetch_one(&mut *tx)
        .await?;

        for user_id in &data.assignees {
            sqlx::query(
                "INSERT INTO task_assignees (task_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = $1",
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(task)
    }

    /// Finds a task by ID, assignees included
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists the tasks a principal may see
    ///
    /// Renders the policy filter server-side: direct access (creator or
    /// assignee) always grants; beyond that a task must be public, attached
    /// to a project, and that project visible under the project rules. Must
    /// stay equivalent to `policy::can_view_task`; `TaskFilter::matches`
    /// pins that in the policy tests.
    pub async fn list_visible(
        pool: &PgPool,
        filter: &TaskFilter,
        query_filters: &TaskQuery,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t LEFT JOIN projects p ON p.id = t.project_id",
        );
        let mut clauses: Vec<String> = Vec::new();
        let mut bind_count = 0;

        if let TaskFilter::Restricted { .. } = filter {
            clauses.push(
                "(t.assigned_by = $1 \
                 OR EXISTS(SELECT 1 FROM task_assignees ta \
                           WHERE ta.task_id = t.id AND ta.user_id = $1) \
                 OR (NOT t.is_private AND t.project_id IS NOT NULL AND ( \
                        p.owner = $1 \
                        OR EXISTS(SELECT 1 FROM project_members pm \
                                  WHERE pm.project_id = p.id AND pm.user_id = $1) \
                        OR (NOT p.is_private AND p.department = ANY($2)))))"
                    .to_string(),
            );
            bind_count = 2;
        }

        if query_filters.project_id.is_some() {
            bind_count += 1;
            clauses.push(format!("t.project_id = ${}", bind_count));
        }
        if query_filters.status.is_some() {
            bind_count += 1;
            clauses.push(format!("t.status = ${}", bind_count));
        }
        if query_filters.assignee.is_some() {
            bind_count += 1;
            clauses.push(format!(
                "EXISTS(SELECT 1 FROM task_assignees ta2 \
                 WHERE ta2.task_id = t.id AND ta2.user_id = ${})",
                bind_count
            ));
        }

        if !clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&clauses.join(" AND "));
        }
        query.push_str(" ORDER BY t.created_at DESC");

        let mut q = sqlx::query_as::<_, Task>(&query);

        if let TaskFilter::Restricted {
            principal,
            departments,
        } = filter
        {
            q = q.bind(*principal).bind(departments);
        }
        if let Some(project_id) = query_filters.project_id {
            q = q.bind(project_id);
        }
        if let Some(status) = query_filters.status {
            q = q.bind(status);
        }
        if let Some(assignee) = query_filters.assignee {
            q = q.bind(assignee);
        }

        let tasks = q.fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Updates an existing task
    ///
    /// Only non-None fields are written; `updated_at` is set to the current
    /// time.
    ///
    /// # Returns
    ///
    /// The updated task if found, None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
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
        if data.progress.is_some() {
            bind_count += 1;
            query.push_str(&format!(", progress = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 RETURNING id");

        let mut q = sqlx::query_scalar::<_, Uuid>(&query).bind(id);

        if let Some(ref title) = data.title {
            q = q.bind(title);
        }
        if let Some(ref description) = data.description {
            q = q.bind(description);
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
        if let Some(progress) = data.progress {
            q = q.bind(progress);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }

        match q.fetch_optional(pool).await? {
            Some(id) => Self::find_by_id(pool, id).await,
            None => Ok(None),
        }
    }

    /// Deletes a task by ID
    ///
    /// # Returns
    ///
    /// True if the task was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets the board status
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            "UPDATE tasks SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await?;

        match updated {
            Some(id) => Self::find_by_id(pool, id).await,
            None => Ok(None),
        }
    }

    /// Sets the progress percentage
    ///
    /// Callers validate the 0..=100 range; the database CHECK backs it up.
    pub async fn set_progress(
        pool: &PgPool,
        id: Uuid,
        progress: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            "UPDATE tasks SET progress = $2, updated_at = NOW() WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(progress)
        .fetch_optional(pool)
        .await?;

        match updated {
            Some(id) => Self::find_by_id(pool, id).await,
            None => Ok(None),
        }
    }

    /// Assigns a user to a task
    ///
    /// Additive at the row level; assigning an already-assigned user is a
    /// no-op.
    pub async fn add_assignee(
        pool: &PgPool,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO task_assignees (task_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(task_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Removes an assignee from a task
    pub async fn remove_assignee(
        pool: &PgPool,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_assignees WHERE task_id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Policy-relevant snapshot of this task
    pub fn access(&self) -> TaskAccess {
        TaskAccess {
            project_id: self.project_id,
            assigned_by: self.assigned_by,
            assignees: self.assignees.clone(),
            is_private: self.is_private,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_as_str() {
        assert_eq!(TaskStatus::Todo.as_str(), "todo");
        assert_eq!(TaskStatus::Working.as_str(), "working");
        assert_eq!(TaskStatus::Done.as_str(), "done");
    }

    #[test]
    fn test_task_status_from_str() {
        assert_eq!("review".parse::<TaskStatus>(), Ok(TaskStatus::Review));
        assert_eq!("stuck".parse::<TaskStatus>(), Ok(TaskStatus::Stuck));
        assert!("archived".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_task_status_default() {
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
    }

    #[test]
    fn test_access_snapshot() {
        let creator = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let now = Utc::now();

        let task = Task {
            id: Uuid::new_v4(),
            title: "Draft landing page".to_string(),
            description: None,
            project_id: None,
            assigned_by: creator,
            assignees: vec![assignee],
            is_private: true,
            status: TaskStatus::Todo,
            priority: Priority::High,
            progress: 0,
            due_date: None,
            created_at: now,
            updated_at: now,
        };

        let access = task.access();
        assert_eq!(access.assigned_by, creator);
        assert_eq!(access.assignees, vec![assignee]);
        assert!(access.project_id.is_none());
        assert!(access.is_private);
    }
}
