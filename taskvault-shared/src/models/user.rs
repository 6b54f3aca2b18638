/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name TEXT NOT NULL CHECK (name <> ''),
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     age INTEGER CHECK (age >= 0),
///     avatar BYTEA,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// API responses never carry the `User` row directly; they carry
/// [`UserBody`], which has no field for the password hash, the avatar
/// blob, or the session set, so none of them can leak through
/// serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password_hash, age, avatar, created_at, updated_at";

/// User account row
///
/// Passwords are stored as Argon2id hashes, never plaintext.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user id
    pub id: Uuid,

    /// Display name (non-empty)
    pub name: String,

    /// Email address, lowercased, unique across all users
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Optional age (non-negative, enforced by a CHECK constraint)
    pub age: Option<i32>,

    /// Optional avatar image bytes
    pub avatar: Option<Vec<u8>>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// External representation of a user
///
/// This is the only user shape serialized into responses. The password
/// hash, avatar bytes, and session tokens are excluded unconditionally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBody {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserBody {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            age: user.age,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Display name
    pub name: String,

    /// Email address (stored lowercased)
    pub email: String,

    /// Argon2id password hash (not the plaintext password)
    pub password_hash: String,

    /// Optional age
    pub age: Option<i32>,
}

/// Input for updating an existing user
///
/// Only `Some` fields are written. The whitelist check against client
/// input happens at the request layer before this struct is built.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    /// New display name
    pub name: Option<String>,

    /// New email address (already validated and lowercased)
    pub email: Option<String>,

    /// New password hash (the handler re-hashes on password change)
    pub password_hash: Option<String>,

    /// New age
    pub age: Option<i32>,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns a database error on unique-constraint violation (duplicate
    /// email) or connection failure.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, age)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.age)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1",
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Resolves a user through an active session token
    ///
    /// The join is the auth guard's membership test: the token must both
    /// decode to this user id and still exist in the sessions table, so a
    /// revoked token resolves to no one even though its signature is
    /// still valid.
    pub async fn find_by_session(
        pool: &PgPool,
        user_id: Uuid,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT u.{}
            FROM users u
            JOIN sessions s ON s.user_id = u.id
            WHERE u.id = $1 AND s.token = $2
            "#,
            USER_COLUMNS.replace(", ", ", u."),
        ))
        .bind(user_id)
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Builds the UPDATE dynamically from the `Some` fields and bumps
    /// `updated_at`.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.age.is_some() {
            bind_count += 1;
            query.push_str(&format!(", age = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(age) = data.age {
            q = q.bind(age);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Stores the avatar image bytes for a user
    pub async fn set_avatar(pool: &PgPool, id: Uuid, avatar: &[u8]) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET avatar = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(avatar)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears the avatar for a user
    pub async fn clear_avatar(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET avatar = NULL, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user account
    ///
    /// Foreign keys cascade: all sessions and all owned tasks are removed
    /// in the same statement.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
