/// Integration tests for the TaskVault API
///
/// These exercise the full HTTP surface against a real PostgreSQL database:
/// signup and login, token revocation, profile updates, avatars, and
/// owner-scoped task CRUD. They are ignored by default; run them with a
/// `DATABASE_URL` and `JWT_SECRET` configured:
///
/// ```bash
/// cargo test -p taskvault-api -- --ignored
/// ```

mod common;

use axum::http::{Method, StatusCode};
use common::TestContext;
use serde_json::json;
use taskvault_shared::models::session::Session;
use uuid::Uuid;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_signup_creates_user_and_token() {
    let ctx = TestContext::new().await.unwrap();

    let email = common::unique_email();
    let (status, body) = ctx
        .request(
            Method::POST,
            "/users",
            None,
            Some(json!({
                "name": "Mike",
                "email": email,
                "password": "MyPass777!",
            })),
        )
        .await
        .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["name"], "Mike");
    assert_eq!(body["user"]["email"], email);
    assert!(body["token"].is_string());

    // The response never exposes credential material
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());

    // And the stored hash is not the plaintext
    let (hash,): (String,) = sqlx::query_as("SELECT password_hash FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_ne!(hash, "MyPass777!");
    assert!(hash.starts_with("$argon2id$"));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_signup_rejects_weak_passwords() {
    let ctx = TestContext::new().await.unwrap();

    for password in ["MyPa!", "ilovemyPassword"] {
        let (status, _) = ctx
            .request(
                Method::POST,
                "/users",
                None,
                Some(json!({
                    "name": "Mike",
                    "email": common::unique_email(),
                    "password": password,
                })),
            )
            .await
            .unwrap();

        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {:?}", password);
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_signup_rejects_duplicate_email() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("First").await.unwrap();

    let (status, body) = ctx
        .request(
            Method::POST,
            "/users",
            None,
            Some(json!({
                "name": "Second",
                "email": user.email,
                "password": "AnotherS3cret!",
            })),
        )
        .await
        .unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already in use");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_login_issues_a_second_session() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();

    let token = ctx.login(&user.email, &user.password).await.unwrap();
    assert_ne!(token, user.token);

    // Signup session plus login session, both live
    let count = Session::count_for_user(&ctx.db, user.id).await.unwrap();
    assert_eq!(count, 2);

    let sessions = Session::list_for_user(&ctx.db, user.id).await.unwrap();
    assert_eq!(sessions[1].token, token);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_login_failure_creates_no_session() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();

    let (status, body) = ctx
        .request(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "email": user.email, "password": "notthepass1" })),
        )
        .await
        .unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unable to login");

    // Unknown email fails identically
    let (status, body) = ctx
        .request(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "email": common::unique_email(), "password": "whatever77" })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unable to login");

    let count = Session::count_for_user(&ctx.db, user.id).await.unwrap();
    assert_eq!(count, 1);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_profile_requires_authentication() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.request(Method::GET, "/users/me", None, None).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Please authenticate");

    // A syntactically valid but unknown token is also rejected
    let (status, _) = ctx
        .request(Method::GET, "/users/me", Some("not-a-real-token"), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_logout_revokes_only_current_session() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();
    let second = ctx.login(&user.email, &user.password).await.unwrap();

    let (status, _) = ctx
        .request(Method::POST, "/users/logout", Some(&user.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    // Revoked token no longer authenticates
    let (status, _) = ctx
        .request(Method::GET, "/users/me", Some(&user.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The other session is untouched
    let (status, _) = ctx
        .request(Method::GET, "/users/me", Some(&second), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    assert!(!Session::contains(&ctx.db, user.id, &user.token).await.unwrap());
    assert!(Session::contains(&ctx.db, user.id, &second).await.unwrap());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_logout_all_revokes_every_session() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();
    let second = ctx.login(&user.email, &user.password).await.unwrap();

    let (status, _) = ctx
        .request(Method::POST, "/users/logoutAll", Some(&second), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    for token in [&user.token, &second] {
        let (status, _) = ctx
            .request(Method::GET, "/users/me", Some(token), None)
            .await
            .unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    assert_eq!(Session::count_for_user(&ctx.db, user.id).await.unwrap(), 0);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_update_profile_whitelist() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();

    let (status, body) = ctx
        .request(
            Method::PATCH,
            "/users/me",
            Some(&user.token),
            Some(json!({ "name": "Michael", "age": 30 })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Michael");
    assert_eq!(body["age"], 30);

    // A field outside the whitelist fails the whole request
    let (status, body) = ctx
        .request(
            Method::PATCH,
            "/users/me",
            Some(&user.token),
            Some(json!({ "location": "Philadelphia" })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid updates");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_password_update_allows_login_with_new_password() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();

    let (status, _) = ctx
        .request(
            Method::PATCH,
            "/users/me",
            Some(&user.token),
            Some(json!({ "password": "BrandNewPhrase9" })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    assert!(ctx.login(&user.email, "BrandNewPhrase9").await.is_ok());
    assert!(ctx.login(&user.email, &user.password).await.is_err());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_delete_account_cascades() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();
    ctx.create_task(&user.token, "Soon orphaned", None)
        .await
        .unwrap();

    let (status, _) = ctx
        .request(Method::DELETE, "/users/me", Some(&user.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    // User, sessions, and tasks are all gone
    let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(users, 0);

    let (tasks,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE owner_id = $1")
        .bind(user.id)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(tasks, 0);

    let (status, _) = ctx
        .request(Method::GET, "/users/me", Some(&user.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_avatar_upload_fetch_and_delete() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();

    let mut png = PNG_MAGIC.to_vec();
    png.extend_from_slice(&[0u8; 64]);

    let (status, _) = ctx
        .request_bytes(
            Method::POST,
            "/users/me/avatar",
            &user.token,
            "image/png",
            png,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    // The avatar is publicly fetchable, no token needed
    let uri = format!("/users/{}/avatar", user.id);
    let (status, _) = ctx.request(Method::GET, &uri, None, None).await.unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .request(Method::DELETE, "/users/me/avatar", Some(&user.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.request(Method::GET, &uri, None, None).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_avatar_rejects_oversized_uploads_as_bad_request() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();

    // Well past both the avatar cap and the default transport body limit;
    // still a validation failure, not a 413
    let mut png = PNG_MAGIC.to_vec();
    png.resize(3_000_000, 0);

    let (status, _) = ctx
        .request_bytes(
            Method::POST,
            "/users/me/avatar",
            &user.token,
            "image/png",
            png,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_avatar_rejects_unsupported_formats() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();

    let (status, _) = ctx
        .request_bytes(
            Method::POST,
            "/users/me/avatar",
            &user.token,
            "application/pdf",
            b"%PDF-1.4 not an image".to_vec(),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_create_task_defaults_to_incomplete() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();

    let (status, body) = ctx
        .request(
            Method::POST,
            "/tasks",
            Some(&user.token),
            Some(json!({ "description": "From my test" })),
        )
        .await
        .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["description"], "From my test");
    assert_eq!(body["completed"], false);
    assert_eq!(body["owner_id"], user.id.to_string());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_tasks_are_invisible_across_owners() {
    let ctx = TestContext::new().await.unwrap();
    let alice = ctx.signup("Alice").await.unwrap();
    let bob = ctx.signup("Bob").await.unwrap();

    let task_id = ctx
        .create_task(&alice.token, "Alice's secret", None)
        .await
        .unwrap();
    let uri = format!("/tasks/{}", task_id);

    // Fetch, update, and delete by another owner all 404
    let (status, _) = ctx
        .request(Method::GET, &uri, Some(&bob.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .request(
            Method::PATCH,
            &uri,
            Some(&bob.token),
            Some(json!({ "completed": true })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .request(Method::DELETE, &uri, Some(&bob.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The task survives untouched for its owner
    let (status, body) = ctx
        .request(Method::GET, &uri, Some(&alice.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], false);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_list_tasks_filter_and_pagination() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();

    ctx.create_task(&user.token, "first", Some(true)).await.unwrap();
    ctx.create_task(&user.token, "second", Some(false)).await.unwrap();
    ctx.create_task(&user.token, "third", Some(true)).await.unwrap();

    let (status, body) = ctx
        .request(Method::GET, "/tasks?completed=true", Some(&user.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = ctx
        .request(
            Method::GET,
            "/tasks?sortBy=createdAt:asc&limit=1&skip=1",
            Some(&user.token),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let page = body.as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["description"], "second");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_list_tasks_rejects_negative_pagination() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();
    ctx.create_task(&user.token, "still here", None).await.unwrap();

    // Validation failures, never database statement errors
    for uri in ["/tasks?limit=-1", "/tasks?skip=-1"] {
        let (status, _) = ctx.request(Method::GET, uri, Some(&user.token), None).await.unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST, "for {}", uri);
    }

    let (status, body) = ctx
        .request(Method::GET, "/tasks?limit=0&skip=0", Some(&user.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_list_tasks_sort_descending() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();

    ctx.create_task(&user.token, "banana", Some(false)).await.unwrap();
    ctx.create_task(&user.token, "apple", Some(true)).await.unwrap();

    let (status, body) = ctx
        .request(
            Method::GET,
            "/tasks?sortBy=description:desc",
            Some(&user.token),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let tasks = body.as_array().unwrap();
    assert_eq!(tasks[0]["description"], "banana");
    assert_eq!(tasks[1]["description"], "apple");

    // An unrecognized sort field is ignored, not rejected
    let (status, body) = ctx
        .request(
            Method::GET,
            "/tasks?sortBy=priority:desc",
            Some(&user.token),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_update_task_rejects_unknown_fields() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();
    let task_id = ctx.create_task(&user.token, "stable", None).await.unwrap();
    let uri = format!("/tasks/{}", task_id);

    let (status, body) = ctx
        .request(
            Method::PATCH,
            &uri,
            Some(&user.token),
            Some(json!({ "description": "changed", "priority": 5 })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid updates");

    // Nothing was written
    let (_, body) = ctx
        .request(Method::GET, &uri, Some(&user.token), None)
        .await
        .unwrap();
    assert_eq!(body["description"], "stable");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_delete_task_returns_the_deleted_row() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.signup("Mike").await.unwrap();
    let task_id = ctx.create_task(&user.token, "short-lived", None).await.unwrap();
    let uri = format!("/tasks/{}", task_id);

    let (status, body) = ctx
        .request(Method::DELETE, &uri, Some(&user.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "short-lived");

    let (status, _) = ctx
        .request(Method::GET, &uri, Some(&user.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting again is the same 404
    let (status, _) = ctx
        .request(Method::DELETE, &uri, Some(&user.token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_tasks_require_authentication() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.request(Method::GET, "/tasks", None, None).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Please authenticate");

    let (status, _) = ctx
        .request(
            Method::POST,
            "/tasks",
            None,
            Some(json!({ "description": "nope" })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .request(
            Method::GET,
            &format!("/tasks/{}", Uuid::new_v4()),
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}
