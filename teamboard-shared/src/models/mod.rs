/// Database models for Teamboard
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts, roles, and department affiliations
/// - `department`: Lightweight grouping entities
/// - `project`: Projects with owner, members, privacy, and department tag
/// - `task`: Tasks, optionally attached to a project, with assignees
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
/// # Ok(())
/// # }
/// ```

pub mod department;
pub mod project;
pub mod task;
pub mod user;

use serde::{Deserialize, Serialize};

/// Priority scale shared by projects and tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Converts priority to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_as_str() {
        assert_eq!(Priority::Low.as_str(), "low");
        assert_eq!(Priority::Urgent.as_str(), "urgent");
    }

    #[test]
    fn test_priority_default() {
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
