//! # Taskvault Shared Library
//!
//! Shared types and business logic used by the taskvault API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, sessions, tasks)
//! - `auth`: Password hashing and JWT primitives
//! - `db`: Connection pool and migration runner

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the taskvault shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
