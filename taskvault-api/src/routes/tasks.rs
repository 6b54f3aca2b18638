/// Task endpoints: owner-scoped CRUD with filtering, sorting, pagination
///
/// # Endpoints
///
/// - `POST /tasks` - create
/// - `GET /tasks?completed&limit&skip&sortBy` - list
/// - `GET /tasks/:id` - fetch one
/// - `PATCH /tasks/:id` - update whitelisted fields
/// - `DELETE /tasks/:id` - delete
///
/// The owner id always comes from the authenticated session; there is no
/// way to address another user's tasks, and a foreign task 404s exactly
/// like a missing one.

use crate::{
    app::{AppState, AuthSession},
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::Value;
use taskvault_shared::models::task::{CreateTask, Task, TaskQuery, TaskSort, UpdateTask};
use uuid::Uuid;

/// Fields a client may set on a task
const TASK_FIELD_WHITELIST: [&str; 2] = ["description", "completed"];

/// Query parameters for GET /tasks
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksParams {
    /// Exact-match completion filter
    pub completed: Option<bool>,

    /// Maximum number of results
    pub limit: Option<i64>,

    /// Offset into the result set
    pub skip: Option<i64>,

    /// `"<field>[:asc|desc]"`; an unrecognized field is ignored rather
    /// than rejected
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

impl ListTasksParams {
    /// Checks pagination values and builds the query
    ///
    /// A negative limit or skip would be rejected by the database anyway,
    /// but as a statement error, not a validation failure; catching it
    /// here keeps the 400 contract.
    fn into_query(self) -> Result<TaskQuery, ApiError> {
        if self.limit.is_some_and(|limit| limit < 0) {
            return Err(field_error("limit", "Limit must be a non-negative number"));
        }
        if self.skip.is_some_and(|skip| skip < 0) {
            return Err(field_error("skip", "Skip must be a non-negative number"));
        }

        Ok(TaskQuery {
            completed: self.completed,
            limit: self.limit,
            skip: self.skip,
            sort: self.sort_by.as_deref().and_then(TaskSort::parse),
        })
    }
}

/// Task creation handler
///
/// Accepts the raw JSON object so unknown keys fail fast with 400 before
/// any write. The owner is forced from the authenticated identity no
/// matter what the client sends (an `owner_id` key in the body is an
/// unknown key and rejected).
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, ApiError>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let object = body
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("Expected a JSON object".to_string()))?;

    ensure_whitelisted(object)?;

    let description = object
        .get("description")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| field_error("description", "Description must be a non-empty string"))?;

    let completed = match object.get("completed") {
        Some(value) => value
            .as_bool()
            .ok_or_else(|| field_error("completed", "Completed must be a boolean"))?,
        None => false,
    };

    let task = Task::create(
        &state.db,
        CreateTask {
            owner_id: auth.user.id,
            description: description.to_string(),
            completed,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Task listing handler
///
/// `GET /tasks?completed=true&limit=10&skip=20&sortBy=createdAt:desc`
///
/// Always scoped to the authenticated owner. Filter, sort, and pagination
/// are all optional; omitting `completed` returns both states.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Query(params): Query<ListTasksParams>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list_by_owner(&state.db, auth.user.id, &params.into_query()?).await?;

    Ok(Json(tasks))
}

/// Single-task fetch handler
///
/// 404 covers both "no such task" and "someone else's task".
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id_and_owner(&state.db, id, auth.user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// Task update handler
///
/// Whitelist is {description, completed}; any other key is a 400 even if
/// its value would be valid, and nothing is written. Ownership is
/// re-verified inside the UPDATE itself.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Path(id): Path<Uuid>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, ApiError>,
) -> ApiResult<Json<Task>> {
    let object = body
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("Expected a JSON object".to_string()))?;

    ensure_whitelisted(object)?;

    let mut update = UpdateTask::default();

    if let Some(value) = object.get("description") {
        let description = value
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| field_error("description", "Description must be a non-empty string"))?;
        update.description = Some(description.to_string());
    }

    if let Some(value) = object.get("completed") {
        let completed = value
            .as_bool()
            .ok_or_else(|| field_error("completed", "Completed must be a boolean"))?;
        update.completed = Some(completed);
    }

    let task = Task::update_by_id_and_owner(&state.db, id, auth.user.id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// Task deletion handler
///
/// Returns the deleted task; a foreign or absent task is the same 404.
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = Task::delete_by_id_and_owner(&state.db, id, auth.user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// Rejects any key outside the task field whitelist
fn ensure_whitelisted(object: &serde_json::Map<String, Value>) -> Result<(), ApiError> {
    if object
        .keys()
        .any(|key| !TASK_FIELD_WHITELIST.contains(&key.as_str()))
    {
        return Err(ApiError::BadRequest("Invalid updates".to_string()));
    }
    Ok(())
}

fn field_error(field: &str, message: &str) -> ApiError {
    ApiError::ValidationError(vec![ValidationErrorDetail {
        field: field.to_string(),
        message: message.to_string(),
    }])
}
