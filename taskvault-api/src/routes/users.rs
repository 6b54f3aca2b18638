/// User endpoints: signup, login, session revocation, profile, avatar
///
/// # Endpoints
///
/// - `POST /users` - signup (public)
/// - `POST /users/login` - login (public)
/// - `POST /users/logout` - revoke the current token
/// - `POST /users/logoutAll` - revoke every token
/// - `GET /users/me` - profile
/// - `PATCH /users/me` - update whitelisted fields
/// - `DELETE /users/me` - delete account (cascades to tasks and sessions)
/// - `POST /users/me/avatar` - upload avatar image
/// - `DELETE /users/me/avatar` - remove avatar
/// - `GET /users/:id/avatar` - serve avatar image (public)

use crate::{
    app::{AppState, AuthSession},
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    body::to_bytes,
    extract::{Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskvault_shared::{
    auth::password,
    models::{
        session::Session,
        user::{CreateUser, UpdateUser, User, UserBody},
    },
};
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

/// Largest accepted avatar upload in bytes
const MAX_AVATAR_BYTES: usize = 1_000_000;

/// Fields a client may set through PATCH /users/me
const USER_UPDATE_WHITELIST: [&str; 4] = ["name", "email", "password", "age"];

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Display name
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (checked against the password policy before hashing)
    pub password: String,

    /// Optional age
    #[validate(range(min = 0, message = "Age must be a non-negative number"))]
    pub age: Option<i32>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Signup/login response: the user plus the one token minted by this
/// operation. The rest of the session set is never serialized.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// External representation of the user
    pub user: UserBody,

    /// The newly issued bearer token
    pub token: String,
}

/// Signup handler
///
/// Validates the request, checks the password policy, hashes the password
/// (the only place plaintext is ever seen besides login), creates the
/// user, issues the first session token, and fires the welcome email.
///
/// # Errors
///
/// - `400`: malformed body, invalid email, weak password, duplicate email
pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SignupRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    password::validate_password(&req.password).map_err(|message| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            email: req.email.to_lowercase(),
            password_hash,
            age: req.age,
        },
    )
    .await?;

    let session = Session::issue(&state.db, user.id, state.jwt_secret()).await?;

    state.mailer.send_welcome(&user.email, &user.name);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token: session.token,
        }),
    ))
}

/// Login handler
///
/// Verifies credentials and appends a fresh token to the session set.
/// Bad credentials are a 400 with a deliberately unspecific message, and
/// no token is issued.
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email.to_lowercase())
        .await?
        .ok_or_else(|| ApiError::BadRequest("Unable to login".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::BadRequest("Unable to login".to_string()));
    }

    let session = Session::issue(&state.db, user.id, state.jwt_secret()).await?;

    Ok(Json(AuthResponse {
        user: user.into(),
        token: session.token,
    }))
}

/// Logout handler: revokes exactly the token used on this request
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<StatusCode> {
    Session::revoke(&state.db, auth.user.id, &auth.token).await?;
    Ok(StatusCode::OK)
}

/// Logout-all handler: clears the user's entire session set
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<StatusCode> {
    Session::revoke_all(&state.db, auth.user.id).await?;
    Ok(StatusCode::OK)
}

/// Profile handler
pub async fn me(Extension(auth): Extension<AuthSession>) -> Json<UserBody> {
    Json(auth.user.into())
}

/// Profile update handler
///
/// Accepts the raw JSON object so an unknown key can be rejected before
/// anything is written; the whitelist is {name, email, password, age}. A
/// password change goes back through the policy check and is re-hashed
/// exactly once.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, ApiError>,
) -> ApiResult<Json<UserBody>> {
    let object = body
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("Expected a JSON object".to_string()))?;

    if object.keys().any(|key| !USER_UPDATE_WHITELIST.contains(&key.as_str())) {
        return Err(ApiError::BadRequest("Invalid updates".to_string()));
    }

    let mut update = UpdateUser::default();

    if let Some(value) = object.get("name") {
        let name = value
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| field_error("name", "Name must be a non-empty string"))?;
        update.name = Some(name.to_string());
    }

    if let Some(value) = object.get("email") {
        let email = value
            .as_str()
            .filter(|s| s.validate_email())
            .ok_or_else(|| field_error("email", "Invalid email format"))?;
        update.email = Some(email.to_lowercase());
    }

    if let Some(value) = object.get("password") {
        let plaintext = value
            .as_str()
            .ok_or_else(|| field_error("password", "Password must be a string"))?;
        password::validate_password(plaintext)
            .map_err(|message| field_error("password", &message))?;
        update.password_hash = Some(password::hash_password(plaintext)?);
    }

    if let Some(value) = object.get("age") {
        let age = value
            .as_i64()
            .filter(|age| *age >= 0 && *age <= i32::MAX as i64)
            .ok_or_else(|| field_error("age", "Age must be a non-negative number"))?;
        update.age = Some(age as i32);
    }

    let user = User::update(&state.db, auth.user.id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Account deletion handler
///
/// The single DELETE cascades to every owned task and every session via
/// foreign keys. The goodbye email is best-effort: its failure never rolls
/// back or surfaces.
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<Json<UserBody>> {
    User::delete(&state.db, auth.user.id).await?;

    state.mailer.send_goodbye(&auth.user.email, &auth.user.name);

    Ok(Json(auth.user.into()))
}

/// Avatar upload handler
///
/// Reads the raw request body up to the size cap, then sniffs the format
/// from magic bytes rather than trusting the Content-Type header. Only
/// JPEG and PNG are accepted. Validation happens before any write.
///
/// The body is read directly instead of through the buffering extractor:
/// an upload over the cap must fail as a 400 validation error, not as a
/// transport-level 413 from the default body limit.
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    request: Request,
) -> ApiResult<StatusCode> {
    let body = to_bytes(request.into_body(), MAX_AVATAR_BYTES)
        .await
        .map_err(|_| {
            ApiError::BadRequest(format!(
                "Image must be at most {} bytes",
                MAX_AVATAR_BYTES
            ))
        })?;

    if body.is_empty() {
        return Err(ApiError::BadRequest("Please upload an image".to_string()));
    }
    if sniff_image_content_type(&body).is_none() {
        return Err(ApiError::BadRequest(
            "Please upload a JPEG or PNG image".to_string(),
        ));
    }

    User::set_avatar(&state.db, auth.user.id, &body).await?;

    Ok(StatusCode::OK)
}

/// Avatar removal handler
pub async fn delete_avatar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<StatusCode> {
    User::clear_avatar(&state.db, auth.user.id).await?;
    Ok(StatusCode::OK)
}

/// Public avatar fetch handler
///
/// Serves the stored bytes with the sniffed content type. Absent user and
/// absent avatar are the same 404.
pub async fn get_avatar(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Avatar not found".to_string()))?;

    let avatar = user
        .avatar
        .ok_or_else(|| ApiError::NotFound("Avatar not found".to_string()))?;

    let content_type = sniff_image_content_type(&avatar).unwrap_or("application/octet-stream");

    Ok(([(header::CONTENT_TYPE, content_type)], avatar).into_response())
}

fn field_error(field: &str, message: &str) -> ApiError {
    ApiError::ValidationError(vec![ValidationErrorDetail {
        field: field.to_string(),
        message: message.to_string(),
    }])
}

/// Returns the MIME type for recognized image magic bytes
fn sniff_image_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else {
        None
    }
}
