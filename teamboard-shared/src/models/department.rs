/// Department model and database operations
///
/// Departments are lightweight grouping entities: a name users and projects
/// reference, plus an optional head-of-department. They carry no policy
/// behavior of their own; the department gate compares names on the user and
/// project records.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE departments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(120) NOT NULL UNIQUE,
///     head UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Department model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Department {
    /// Unique department ID
    pub id: Uuid,

    /// Department name, unique
    pub name: String,

    /// Optional head-of-department user
    pub head: Option<Uuid>,

    /// When the department was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new department
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepartment {
    /// Department name
    pub name: String,

    /// Optional head-of-department user
    pub head: Option<Uuid>,
}

impl Department {
    /// Creates a new department
    ///
    /// # Errors
    ///
    /// Returns an error if the name already exists or the head user id does
    /// not resolve.
    pub async fn create(pool: &PgPool, data: CreateDepartment) -> Result<Self, sqlx::Error> {
        let department = sqlx::query_as::<_, Department>(
            r#"
            INSERT INTO departments (name, head)
            VALUES ($1, $2)
            RETURNING id, name, head, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.head)
        .fetch_one(pool)
        .await?;

        Ok(department)
    }

    /// Finds a department by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let department = sqlx::query_as::<_, Department>(
            "SELECT id, name, head, created_at FROM departments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(department)
    }

    /// Finds a department by name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let department = sqlx::query_as::<_, Department>(
            "SELECT id, name, head, created_at FROM departments WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(department)
    }

    /// Lists all departments, ordered by name
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let departments = sqlx::query_as::<_, Department>(
            "SELECT id, name, head, created_at FROM departments ORDER BY name ASC",
        )
        .fetch_all(pool)
        .await?;

        Ok(departments)
    }

    /// Deletes a department by ID
    ///
    /// # Returns
    ///
    /// True if the department was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_department_struct() {
        let create = CreateDepartment {
            name: "Sales".to_string(),
            head: None,
        };

        assert_eq!(create.name, "Sales");
        assert!(create.head.is_none());
    }
}
