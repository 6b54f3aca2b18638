/// Task model and the owner-scoped query engine
///
/// Every read and write here takes the owner id as part of the WHERE
/// clause, never as a post-load check. A task that exists but belongs to
/// someone else is indistinguishable from one that does not exist, so
/// handlers can map an empty result straight to 404 without leaking
/// existence.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     description TEXT NOT NULL CHECK (description <> ''),
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, owner_id, description, completed, created_at, updated_at";

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task id
    pub id: Uuid,

    /// Owning user; set from the authenticated identity at creation and
    /// immutable afterwards
    pub owner_id: Uuid,

    /// Task description (non-empty)
    pub description: String,

    /// Completion flag (defaults to false)
    pub completed: bool,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Sortable task fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Description,
    Completed,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Column name for ORDER BY; fixed set, so never built from raw input
    fn column(self) -> &'static str {
        match self {
            SortField::Description => "description",
            SortField::Completed => "completed",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }

    fn parse(field: &str) -> Option<Self> {
        match field {
            "description" => Some(SortField::Description),
            "completed" => Some(SortField::Completed),
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }
}

/// Sort direction; omitted in the query string means ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Parsed `sortBy` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl TaskSort {
    /// Parses a `"<field>[:asc|desc]"` sort expression
    ///
    /// An unrecognized field yields `None`: the parameter is silently
    /// ignored and the listing falls back to unspecified order. The
    /// direction is permissive the other way: anything that is not
    /// exactly `desc` sorts ascending. Both are deliberate, not error
    /// paths.
    pub fn parse(sort_by: &str) -> Option<Self> {
        let (field, direction) = match sort_by.split_once(':') {
            Some((field, "desc")) => (field, SortDirection::Desc),
            Some((field, _)) => (field, SortDirection::Asc),
            None => (sort_by, SortDirection::default()),
        };

        SortField::parse(field).map(|field| TaskSort { field, direction })
    }
}

/// Parameters for an owner-scoped task listing
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    /// Exact-match completion filter; absent returns both
    pub completed: Option<bool>,

    /// Maximum number of results; absent is unbounded
    pub limit: Option<i64>,

    /// Offset into the result set; absent is 0
    pub skip: Option<i64>,

    /// Ordering; absent means unspecified order
    pub sort: Option<TaskSort>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    /// Owning user (from the authenticated identity, never client input)
    pub owner_id: Uuid,

    /// Task description
    pub description: String,

    /// Initial completion flag
    pub completed: bool,
}

/// Input for updating a task
///
/// Only `Some` fields are written. Whitelist enforcement against raw
/// client keys happens at the request layer.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl Task {
    /// Creates a new task for an owner
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (owner_id, description, completed)
            VALUES ($1, $2, $3)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(data.owner_id)
        .bind(data.description)
        .bind(data.completed)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Fetches a task by id with ownership enforced in the query
    ///
    /// Returns `None` both when the task is absent and when it belongs to
    /// another owner.
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND owner_id = $2",
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists an owner's tasks with filtering, sorting, and pagination
    ///
    /// The owner scope is unconditional; filter, ORDER BY, LIMIT, and
    /// OFFSET clauses are appended only when requested.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        query: &TaskQuery,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = $1");
        let mut bind_count = 1;

        if query.completed.is_some() {
            bind_count += 1;
            sql.push_str(&format!(" AND completed = ${}", bind_count));
        }

        if let Some(sort) = query.sort {
            // Column and direction come from fixed enums, never raw input
            sql.push_str(&format!(
                " ORDER BY {} {}",
                sort.field.column(),
                sort.direction.keyword()
            ));
        }

        if query.limit.is_some() {
            bind_count += 1;
            sql.push_str(&format!(" LIMIT ${}", bind_count));
        }
        if query.skip.is_some() {
            bind_count += 1;
            sql.push_str(&format!(" OFFSET ${}", bind_count));
        }

        let mut q = sqlx::query_as::<_, Task>(&sql).bind(owner_id);

        if let Some(completed) = query.completed {
            q = q.bind(completed);
        }
        if let Some(limit) = query.limit {
            q = q.bind(limit);
        }
        if let Some(skip) = query.skip {
            q = q.bind(skip);
        }

        let tasks = q.fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Updates a task, re-verifying ownership in the same statement
    ///
    /// Returns `None` when the task is absent or foreign-owned; nothing is
    /// written in that case.
    pub async fn update_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut sql = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.description.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", description = ${}", bind_count));
        }
        if data.completed.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", completed = ${}", bind_count));
        }

        sql.push_str(&format!(
            " WHERE id = $1 AND owner_id = $2 RETURNING {TASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&sql).bind(id).bind(owner_id);

        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(completed) = data.completed {
            q = q.bind(completed);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task if owned, returning the deleted row
    pub async fn delete_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "DELETE FROM tasks WHERE id = $1 AND owner_id = $2 RETURNING {TASK_COLUMNS}",
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }
}
