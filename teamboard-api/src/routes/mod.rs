/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, refresh)
/// - `projects`: Project CRUD, member management, favorite toggle
/// - `tasks`: Task CRUD, status/progress updates, assignment
/// - `departments`: Department listing and admin management
/// - `users`: User listing, profile, and admin edits
///
/// Every handler that touches a project or task loads the resource, invokes
/// the policy evaluator, and maps deny to 403 and missing id to 404; the two
/// are never conflated.

pub mod auth;
pub mod departments;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;
