/// Application state, router builder, and the auth guard
///
/// # Router
///
/// ```text
/// /
/// ├── /health                       # Health check (public)
/// ├── /users
/// │   ├── POST   /                  # Signup (public)
/// │   ├── POST   /login             # Login (public)
/// │   ├── GET    /:id/avatar        # Serve avatar (public)
/// │   ├── POST   /logout            # Revoke current token
/// │   ├── POST   /logoutAll         # Revoke all tokens
/// │   ├── GET    /me                # Profile
/// │   ├── PATCH  /me                # Update whitelisted fields
/// │   ├── DELETE /me                # Delete account (cascades)
/// │   ├── POST   /me/avatar         # Upload avatar
/// │   └── DELETE /me/avatar         # Remove avatar
/// └── /tasks
///     ├── POST   /                  # Create
///     ├── GET    /                  # List (owner-scoped)
///     ├── GET    /:id               # Fetch one
///     ├── PATCH  /:id               # Update whitelisted fields
///     └── DELETE /:id               # Delete
/// ```
///
/// Everything below the public routes sits behind [`auth_layer`].

use crate::{config::Config, email::Mailer, error::ApiError};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskvault_shared::{auth::jwt, models::user::User};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned per request via Axum's `State` extractor; Arc keeps it cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Outbound mail dispatcher
    pub mailer: Mailer,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        let mailer = Mailer::new(config.mail.clone());
        Self {
            db,
            config: Arc::new(config),
            mailer,
        }
    }

    /// Gets the JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Authenticated request context
///
/// Inserted into request extensions by [`auth_layer`]. Carries the exact
/// token that authenticated this request so logout can revoke precisely
/// that session.
#[derive(Clone)]
pub struct AuthSession {
    /// The resolved user
    pub user: User,

    /// The token string presented on this request
    pub token: String,
}

/// Builds the complete Axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Public: no auth required
    let public_user_routes = Router::new()
        .route("/", post(routes::users::signup))
        .route("/login", post(routes::users::login))
        .route("/:id/avatar", get(routes::users::get_avatar));

    // Protected user routes
    let user_routes = Router::new()
        .route("/logout", post(routes::users::logout))
        .route("/logoutAll", post(routes::users::logout_all))
        .route(
            "/me",
            get(routes::users::me)
                .patch(routes::users::update_me)
                .delete(routes::users::delete_me),
        )
        .route(
            "/me/avatar",
            post(routes::users::upload_avatar).delete(routes::users::delete_avatar),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ));

    // Task routes: every one of them is owner-scoped
    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task).get(routes::tasks::list_tasks))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ));

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/users", public_user_routes.merge(user_routes))
        .nest("/tasks", task_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Auth guard middleware
///
/// Per-request state machine:
/// `Unauthenticated -> TokenPresent -> TokenValid -> IdentityResolved`,
/// failing to 401 at any step.
///
/// 1. Missing or non-Bearer Authorization header -> 401
/// 2. Token fails signature/structure validation -> 401
/// 3. No session row matches (user id, exact token string) -> 401; a
///    revoked token dies here even though its signature still verifies
/// 4. Success: `AuthSession { user, token }` goes into request extensions
async fn auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v: &HeaderValue| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Please authenticate".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Please authenticate".to_string()))?
        .to_string();

    let claims = jwt::validate_token(&token, state.jwt_secret())?;

    let user = User::find_by_session(&state.db, claims.sub, &token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Please authenticate".to_string()))?;

    req.extensions_mut().insert(AuthSession { user, token });

    Ok(next.run(req).await)
}
