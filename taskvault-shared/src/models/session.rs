/// Session model: the per-user set of issued bearer tokens
///
/// Each row is one active token. Issuing appends to the set, logout
/// removes exactly one member, logout-all clears it, and the auth guard
/// does a membership test on every protected request. Rows are ordered by
/// `created_at`, which preserves the positional semantics of the token
/// list (the second login produces the second token).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::jwt::{self, JwtError};

/// One active session (issued token) for a user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    /// Session id (also the token's `jti` claim)
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// The exact signed token string presented by the client
    pub token: String,

    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

/// Error type for session issuance
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Token signing failed
    #[error(transparent)]
    Jwt(#[from] JwtError),

    /// Database operation failed
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Session {
    /// Issues a new token for a user and appends it to their session set
    ///
    /// The session id is generated first and embedded in the token as
    /// `jti`, then the signed token string is persisted.
    pub async fn issue(pool: &PgPool, user_id: Uuid, secret: &str) -> Result<Self, SessionError> {
        let session_id = Uuid::new_v4();
        let claims = jwt::Claims::new(user_id, session_id);
        let token = jwt::create_token(&claims, secret)?;

        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, token)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token, created_at
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(&token)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// Revokes exactly the matching token (single-session logout)
    pub async fn revoke(pool: &PgPool, user_id: Uuid, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes every token for a user (logout of all devices)
    pub async fn revoke_all(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Membership test: is this exact token currently active for the user?
    pub async fn contains(
        pool: &PgPool,
        user_id: Uuid,
        token: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sessions WHERE user_id = $1 AND token = $2")
                .bind(user_id)
                .bind(token)
                .fetch_optional(pool)
                .await?;

        Ok(row.is_some())
    }

    /// Lists a user's sessions in issuance order
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, token, created_at
            FROM sessions
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(sessions)
    }

    /// Counts a user's active sessions
    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

// Session CRUD is exercised end to end by the integration tests in
// taskvault-api/tests/; token signing itself is covered in auth::jwt.
