/// User model and database operations
///
/// This module provides the User model and CRUD operations for managing user
/// accounts. Users carry the role and department affiliations the access
/// policy evaluator reads; the policy layer always sees the legacy single
/// `department` column and the newer `departments` array as one normalized
/// set (see `policy::Principal::from_user`).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'manager', 'member', 'guest');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     username VARCHAR(64) UNIQUE,
///     full_name VARCHAR(255),
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'member',
///     department VARCHAR(120),
///     departments TEXT[] NOT NULL DEFAULT '{}',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::models::user::{CreateUser, Role, User};
/// use teamboard_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     full_name: Some("Jane Doe".to_string()),
///     username: None,
///     role: Role::Member,
///     department: None,
///     departments: vec!["Sales".to_string()],
/// }).await?;
///
/// let found = User::find_by_email(&pool, "user@example.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Baseline privilege of a user account
///
/// Hierarchy: Admin > Manager > Member > Guest. Resource-level rights
/// (ownership, membership, department gates) are layered on top by the
/// policy evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sees and manages everything
    Admin,

    /// Elevated rights over department resources (project delete)
    Manager,

    /// Regular account; rights come from ownership and membership
    Member,

    /// Restricted external account
    Guest,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Member => "member",
            Role::Guest => "guest",
        }
    }

    /// Can manage user accounts (roles, departments, deactivation)
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Can manage departments
    pub fn can_manage_departments(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Checks if this role is at least the required role
    ///
    /// Hierarchy: Admin > Manager > Member > Guest
    pub fn has_at_least(&self, required: Role) -> bool {
        self.permission_level() >= required.permission_level()
    }

    fn permission_level(&self) -> u8 {
        match self {
            Role::Admin => 4,
            Role::Manager => 3,
            Role::Member => 2,
            Role::Guest => 1,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Member
    }
}

/// User model representing an account
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT), unique across all users
    pub email: String,

    /// Optional unique handle
    pub username: Option<String>,

    /// Optional display name
    pub full_name: Option<String>,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Baseline privilege
    pub role: Role,

    /// Legacy single department affiliation
    ///
    /// Kept alongside `departments` for records ingested before the
    /// multi-department model; policy always reads the union of both.
    pub department: Option<String>,

    /// Department affiliations
    pub departments: Vec<String>,

    /// Inactive users cannot authenticate
    pub is_active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address (stored lowercase via CITEXT)
    pub email: String,

    /// Argon2id password hash (NOT a plaintext password)
    pub password_hash: String,

    /// Optional display name
    pub full_name: Option<String>,

    /// Optional unique handle
    pub username: Option<String>,

    /// Baseline privilege (defaults to Member)
    #[serde(default)]
    pub role: Role,

    /// Legacy single department, accepted at the boundary and normalized
    /// into the set by the policy layer
    pub department: Option<String>,

    /// Department affiliations
    #[serde(default)]
    pub departments: Vec<String>,
}

/// Input for updating an existing user
///
/// All fields are optional; only non-None fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New email address
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    /// New display name (use Some(None) to clear)
    pub full_name: Option<Option<String>>,

    /// New role
    pub role: Option<Role>,

    /// New legacy department value (use Some(None) to clear)
    pub department: Option<Option<String>>,

    /// New department list
    pub departments: Option<Vec<String>>,

    /// Activate or deactivate the account
    pub is_active: Option<bool>,
}

const USER_COLUMNS: &str = "id, email, username, full_name, password_hash, role, \
                            department, departments, is_active, created_at, updated_at";

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email or username already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, full_name, username, role, department, departments)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.full_name)
        .bind(data.username)
        .bind(data.role)
        .bind(data.department)
        .bind(data.departments)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address (case-insensitive via CITEXT)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1",
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` are written; `updated_at` is set to the
    /// current time.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if the user doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.full_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", full_name = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }
        if data.department.is_some() {
            bind_count += 1;
            query.push_str(&format!(", department = ${}", bind_count));
        }
        if data.departments.is_some() {
            bind_count += 1;
            query.push_str(&format!(", departments = ${}", bind_count));
        }
        if data.is_active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_active = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(full_name) = data.full_name {
            q = q.bind(full_name);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }
        if let Some(department) = data.department {
            q = q.bind(department);
        }
        if let Some(departments) = data.departments {
            q = q.bind(departments);
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Deletes a user by ID
    ///
    /// # Returns
    ///
    /// True if the user was deleted, false if the user didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Checks whether the user still owns any projects
    ///
    /// Deletion is blocked while this is true, so no project is left with a
    /// dangling owner reference.
    pub async fn owns_projects(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE owner = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Lists all users, ordered by creation date (newest first)
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Counts total number of users
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
impl User {
    /// Builds an in-memory user record for pure tests
    pub fn sample_with_departments(department: Option<&str>, departments: &[&str]) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            username: None,
            full_name: None,
            password_hash: "hash".to_string(),
            role: Role::Member,
            department: department.map(str::to_string),
            departments: departments.iter().map(|d| d.to_string()).collect(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::Manager.as_str(), "manager");
        assert_eq!(Role::Member.as_str(), "member");
        assert_eq!(Role::Guest.as_str(), "guest");
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Admin.has_at_least(Role::Manager));
        assert!(Role::Manager.has_at_least(Role::Member));
        assert!(!Role::Member.has_at_least(Role::Manager));
        assert!(!Role::Guest.has_at_least(Role::Member));
        assert!(Role::Member.has_at_least(Role::Member));
    }

    #[test]
    fn test_role_management_rights() {
        assert!(Role::Admin.can_manage_users());
        assert!(Role::Admin.can_manage_departments());

        for role in [Role::Manager, Role::Member, Role::Guest] {
            assert!(!role.can_manage_users());
            assert!(!role.can_manage_departments());
        }
    }

    #[test]
    fn test_update_user_default() {
        let update = UpdateUser::default();
        assert!(update.email.is_none());
        assert!(update.role.is_none());
        assert!(update.departments.is_none());
        assert!(update.is_active.is_none());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::sample_with_departments(None, &[]);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("email").is_some());
    }
}
