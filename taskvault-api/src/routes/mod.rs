/// API route handlers
///
/// Organized by resource:
///
/// - `health`: health check endpoint
/// - `users`: signup, login, sessions, profile, avatar
/// - `tasks`: owner-scoped task CRUD with filtering and pagination

pub mod health;
pub mod tasks;
pub mod users;
