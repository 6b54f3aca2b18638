/// Database models
///
/// # Models
///
/// - `user`: user accounts and their external representation
/// - `session`: issued bearer tokens (the per-user session set)
/// - `task`: per-user tasks and the owner-scoped query engine

pub mod session;
pub mod task;
pub mod user;
