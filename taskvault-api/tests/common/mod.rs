/// Common test utilities for integration tests
///
/// Provides a [`TestContext`] that connects to the database named by
/// `DATABASE_URL`, runs migrations, and builds the full router so tests
/// exercise real HTTP semantics end to end. Users created through
/// [`TestContext::signup`] get unique throwaway emails; `cleanup` removes
/// them (sessions and tasks go with them via FK cascade).

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::PgPool;
use taskvault_api::app::{build_router, AppState};
use taskvault_api::config::Config;
use tower::Service as _;
use uuid::Uuid;

const TEST_EMAIL_DOMAIN: &str = "integration.taskvault.test";

/// Test context containing the database pool and a ready-to-call router
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
}

/// A signed-up test user plus the token from signup
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub token: String,
}

impl TestContext {
    /// Creates a new test context against the configured database
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;

        // Path relative to this crate's Cargo.toml, not this file
        sqlx::migrate!("../migrations").run(&db).await?;

        let state = AppState::new(db.clone(), config);
        let app = build_router(state);

        Ok(Self { db, app })
    }

    /// Sends a request through the router and returns status plus parsed body
    ///
    /// The body comes back as `Value::Null` when the response is empty or
    /// not JSON.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.app.clone().call(request).await?;
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Ok((status, json))
    }

    /// Sends raw bytes (used for avatar uploads)
    pub async fn request_bytes(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))?;

        let response = self.app.clone().call(request).await?;
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Ok((status, json))
    }

    /// Signs up a fresh user with a unique email and returns their identity
    pub async fn signup(&self, name: &str) -> anyhow::Result<TestUser> {
        let email = unique_email();
        let password = "S3curePhrase!".to_string();

        let (status, body) = self
            .request(
                Method::POST,
                "/users",
                None,
                Some(serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": password,
                })),
            )
            .await?;

        anyhow::ensure!(
            status == StatusCode::CREATED,
            "signup failed: {} {}",
            status,
            body
        );

        let id = body["user"]["id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| anyhow::anyhow!("signup response missing user id: {}", body))?;
        let token = body["token"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("signup response missing token: {}", body))?
            .to_string();

        Ok(TestUser {
            id,
            email,
            password,
            token,
        })
    }

    /// Logs a user in and returns the newly issued token
    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<String> {
        let (status, body) = self
            .request(
                Method::POST,
                "/users/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await?;

        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);

        body["token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("login response missing token: {}", body))
    }

    /// Creates a task and returns its id
    pub async fn create_task(
        &self,
        token: &str,
        description: &str,
        completed: Option<bool>,
    ) -> anyhow::Result<Uuid> {
        let mut body = serde_json::json!({ "description": description });
        if let Some(completed) = completed {
            body["completed"] = Value::Bool(completed);
        }

        let (status, body) = self
            .request(Method::POST, "/tasks", Some(token), Some(body))
            .await?;

        anyhow::ensure!(
            status == StatusCode::CREATED,
            "task creation failed: {} {}",
            status,
            body
        );

        body["id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| anyhow::anyhow!("task response missing id: {}", body))
    }

    /// Removes all users created by this test run's email domain
    ///
    /// Sessions and tasks follow via ON DELETE CASCADE.
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE email LIKE $1")
            .bind(format!("%@{}", TEST_EMAIL_DOMAIN))
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

/// Generates a throwaway email unique to this call
pub fn unique_email() -> String {
    format!("test-{}@{}", Uuid::new_v4(), TEST_EMAIL_DOMAIN)
}
