//! # Taskvault API Server Library
//!
//! Personal task-management REST API: signup/login with revocable bearer
//! tokens, profile and avatar management, and owner-scoped CRUD over
//! tasks with filtering, sorting, and pagination.
//!
//! ## Modules
//!
//! - `app`: Application state, router, and the auth guard middleware
//! - `config`: Configuration management
//! - `email`: Fire-and-forget account lifecycle emails
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod email;
pub mod error;
pub mod routes;
