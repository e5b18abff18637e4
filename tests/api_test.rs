//! End-to-end tests for the HTTP API
//!
//! Tests cover:
//! - Registration, login, email checks and bearer-token identity
//! - Legacy bio-embedded credentials
//! - Posts, comments and like toggles
//! - Projects, profiles and health

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rusqlite::params;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use casira_connect::config::Config;
use casira_connect::db;
use casira_connect::routes;
use casira_connect::state::{AppState, DbPool};

const TEST_COST: u32 = 4;

fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.bcrypt_cost = TEST_COST;
    config.auth.jwt_secret = Some("integration-test-secret".into());
    config
}

// Helper to create an app over a fresh in-memory store
fn create_test_app() -> (Router, DbPool) {
    let pool = db::create_memory_pool().unwrap();
    db::run_migrations(&pool).unwrap();
    let app = routes::app(AppState::new(pool.clone(), test_config()));
    (app, pool)
}

async fn create_seeded_app() -> Router {
    let pool = db::create_memory_pool().unwrap();
    db::run_migrations(&pool).unwrap();
    db::seed::seed_sample_data(&pool, TEST_COST).await.unwrap();
    routes::app(AppState::new(pool, test_config()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body), None).await
}

async fn register(app: &Router, email: &str, password: &str) -> Value {
    let (status, body) = post(
        app,
        "/api/auth/register",
        json!({
            "email": email,
            "password": password,
            "first_name": "A",
            "last_name": "B",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body
}

// ============================================================================
// AUTH TESTS
// ============================================================================

#[tokio::test]
async fn test_register_then_login() {
    let (app, _pool) = create_test_app();

    let body = register(&app, "a@x.com", "secret1").await;
    assert_eq!(body["user"]["role"], "visitor");
    assert_eq!(body["user"]["email"], "a@x.com");
    assert!(!body["token"].as_str().unwrap().is_empty());

    let (status, body) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "a@x.com", "password": "wrong" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "auth_error");
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "A@X.com ", "password": "secret1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_email_gets_same_response_as_wrong_password() {
    let (app, _pool) = create_test_app();
    register(&app, "a@x.com", "secret1").await;

    let (s1, b1) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "a@x.com", "password": "nope12" }),
    )
    .await;
    let (s2, b2) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "ghost@x.com", "password": "nope12" }),
    )
    .await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s1, s2);
    assert_eq!(b1, b2);
}

#[tokio::test]
async fn test_inactive_user_cannot_login() {
    let (app, pool) = create_test_app();
    register(&app, "a@x.com", "secret1").await;
    pool.get()
        .unwrap()
        .execute("UPDATE users SET is_active = 0 WHERE email = 'a@x.com'", [])
        .unwrap();

    let (status, _) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "a@x.com", "password": "secret1" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let (app, _pool) = create_test_app();
    register(&app, "a@x.com", "secret1").await;

    let (status, body) = post(
        &app,
        "/api/auth/register",
        json!({
            "email": "  A@X.COM ",
            "password": "another1",
            "first_name": "C",
            "last_name": "D",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_register_validation() {
    let (app, _pool) = create_test_app();

    let cases = [
        json!({ "email": "a@x.com", "password": "12345", "first_name": "A", "last_name": "B" }),
        json!({ "email": "a@x.com", "password": "secret1", "first_name": " ", "last_name": "B" }),
        json!({ "password": "secret1", "first_name": "A", "last_name": "B" }),
        json!({
            "email": "a@x.com", "password": "secret1",
            "first_name": "A", "last_name": "B", "role": "superuser"
        }),
    ];
    for case in cases {
        let (status, body) = post(&app, "/api/auth/register", case.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case {}", case);
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn test_register_with_role() {
    let (app, _pool) = create_test_app();
    let (status, body) = post(
        &app,
        "/api/auth/register",
        json!({
            "email": "d@x.com", "password": "secret1",
            "first_name": "D", "last_name": "E", "role": "donor"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "donor");
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let (app, _pool) = create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_check_email() {
    let (app, _pool) = create_test_app();

    let (_, body) = post(&app, "/api/auth/check-email", json!({ "email": "a@x.com" })).await;
    assert_eq!(body["exists"], false);

    register(&app, "a@x.com", "secret1").await;
    let (status, body) =
        post(&app, "/api/auth/check-email", json!({ "email": " A@x.com" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);
}

#[tokio::test]
async fn test_me_requires_valid_bearer_token() {
    let (app, _pool) = create_test_app();
    let registered = register(&app, "a@x.com", "secret1").await;
    let token = registered["token"].as_str().unwrap();

    let (status, body) = send(&app, "GET", "/api/auth/me", None, Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["claims"]["email"], "a@x.com");
    assert_eq!(body["claims"]["iss"], "casira-connect");
    assert_eq!(body["claims"]["user_id"], registered["user"]["id"]);
    assert_eq!(body["user"]["email"], "a@x.com");

    let (status, body) = get(&app, "/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing bearer token");

    let (status, body) = send(&app, "GET", "/api/auth/me", None, Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_responses_never_contain_hashes() {
    let (app, _pool) = create_test_app();
    let body = register(&app, "a@x.com", "secret1").await;
    let text = body.to_string();
    assert!(!text.contains("$2b$"));
    assert!(!text.contains("password"));
}

// ============================================================================
// LEGACY CREDENTIAL TESTS
// ============================================================================

#[tokio::test]
async fn test_legacy_bio_credential_logs_in_and_migrates() {
    let (app, pool) = create_test_app();
    let hash = bcrypt::hash("legacy1", TEST_COST).unwrap();
    pool.get()
        .unwrap()
        .execute(
            "INSERT INTO users (email, first_name, last_name, bio) VALUES (?1, 'Old', 'User', ?2)",
            params!["old@x.com", format!("CASIRA_PWD:{}|Hola mundo", hash)],
        )
        .unwrap();

    let (status, body) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "old@x.com", "password": "legacy1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["bio"], "Hola mundo");
    assert!(!body.to_string().contains("CASIRA_PWD"));

    let (stored_hash, bio): (Option<String>, String) = pool
        .get()
        .unwrap()
        .query_row(
            "SELECT password_hash, bio FROM users WHERE email = 'old@x.com'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(stored_hash.as_deref(), Some(hash.as_str()));
    assert_eq!(bio, "Hola mundo");

    // Still works after migration
    let (status, _) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "old@x.com", "password": "legacy1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_profile_bio_update_keeps_legacy_login_working() {
    let (app, pool) = create_test_app();
    let hash = bcrypt::hash("legacy1", TEST_COST).unwrap();
    let conn = pool.get().unwrap();
    conn.execute(
        "INSERT INTO users (email, first_name, last_name, bio) VALUES (?1, 'Old', 'User', ?2)",
        params!["old@x.com", format!("CASIRA_PWD:{}|Hola", hash)],
    )
    .unwrap();
    let id = conn.last_insert_rowid();
    drop(conn);

    let (status, body) = post(
        &app,
        "/api/users/profile",
        json!({ "user_id": id, "bio": "Nueva bio" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["bio"], "Nueva bio");

    let (status, _) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "old@x.com", "password": "legacy1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// USER TESTS
// ============================================================================

#[tokio::test]
async fn test_get_user_and_update_profile() {
    let (app, _pool) = create_test_app();
    let registered = register(&app, "a@x.com", "secret1").await;
    let id = registered["user"]["id"].as_i64().unwrap();

    let (status, body) = get(&app, &format!("/api/users/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["first_name"], "A");

    let (status, body) = post(
        &app,
        "/api/users/profile",
        json!({ "user_id": id, "first_name": "Ana" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["first_name"], "Ana");
    assert_eq!(body["user"]["last_name"], "B");

    let (status, _) = get(&app, "/api/users/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&app, "/api/users/profile", json!({ "user_id": id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/api/users/profile",
        json!({ "user_id": 999, "bio": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// POST & LIKE TESTS
// ============================================================================

#[tokio::test]
async fn test_post_like_toggle() {
    let (app, _pool) = create_test_app();

    let (status, body) = post(&app, "/api/posts", json!({ "content": "hello" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let post_body = &body["post"];
    assert_eq!(post_body["likes_count"], 0);
    assert_eq!(post_body["comments_count"], 0);
    assert_eq!(post_body["author_id"], 1);
    assert_eq!(post_body["author"], "Usuario");
    let id = post_body["id"].as_i64().unwrap();
    let uri = format!("/api/posts/{}/like", id);

    let (status, body) = post(&app, &uri, json!({ "user_id": 1 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], true);
    assert_eq!(body["likes_count"], 1);

    let (_, body) = post(&app, &uri, json!({ "user_id": 1 })).await;
    assert_eq!(body["liked"], false);
    assert_eq!(body["likes_count"], 0);
}

#[tokio::test]
async fn test_post_author_is_resolved() {
    let (app, _pool) = create_test_app();
    let registered = register(&app, "a@x.com", "secret1").await;
    let id = registered["user"]["id"].as_i64().unwrap();

    let (_, body) = post(
        &app,
        "/api/posts",
        json!({ "content": "hola", "author_id": id, "title": "Saludo" }),
    )
    .await;
    assert_eq!(body["post"]["author"], "A B");
    assert_eq!(body["post"]["title"], "Saludo");
}

#[tokio::test]
async fn test_post_validation_and_missing_post() {
    let (app, _pool) = create_test_app();

    let (status, _) = post(&app, "/api/posts", json!({ "content": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(&app, "/api/posts/42/like", json!({ "user_id": 1 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = get(&app, "/api/posts/42/comments").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comments_and_comment_likes() {
    let (app, _pool) = create_test_app();
    let (_, body) = post(&app, "/api/posts", json!({ "content": "hello" })).await;
    let post_id = body["post"]["id"].as_i64().unwrap();
    let comments_uri = format!("/api/posts/{}/comments", post_id);

    let (status, _) = post(&app, &comments_uri, json!({ "content": "", "author_id": 2 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(
        &app,
        &comments_uri,
        json!({ "content": "nice", "author_id": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["comment"]["author"], "Usuario desconocido");
    assert_eq!(body["comment"]["likes_count"], 0);
    let comment_id = body["comment"]["id"].as_i64().unwrap();

    let (status, body) = get(&app, &comments_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["comments"][0]["content"], "nice");

    let like_uri = format!("/api/posts/{}/comments/{}/like", post_id, comment_id);
    let (_, body) = post(&app, &like_uri, json!({ "user_id": 3 })).await;
    assert_eq!(body["liked"], true);
    assert_eq!(body["likes_count"], 1);
    let (_, body) = post(&app, &like_uri, json!({ "user_id": 3 })).await;
    assert_eq!(body["liked"], false);
    assert_eq!(body["likes_count"], 0);

    let (status, _) = post(
        &app,
        &format!("/api/posts/{}/comments/999/like", post_id),
        json!({ "user_id": 3 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get(&app, "/api/posts").await;
    let listed = &body["posts"][0];
    assert_eq!(listed["comments_count"], 1);
    assert_eq!(listed["comments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_posts_paginates_newest_first() {
    let (app, _pool) = create_test_app();
    for content in ["one", "two", "three"] {
        post(&app, "/api/posts", json!({ "content": content })).await;
    }

    let (status, body) = get(&app, "/api/posts?page=1&per_page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["posts"][0]["content"], "three");
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["pages"], 2);
    assert_eq!(body["pagination"]["has_next"], true);
    assert_eq!(body["pagination"]["has_prev"], false);

    let (_, body) = get(&app, "/api/posts?page=2&per_page=2").await;
    assert_eq!(body["posts"][0]["content"], "one");
    assert_eq!(body["pagination"]["has_next"], false);
}

// ============================================================================
// SEEDED DATA, PROJECTS & HEALTH
// ============================================================================

#[tokio::test]
async fn test_seeded_admin_can_login() {
    let app = create_seeded_app().await;
    let (status, body) = post(
        &app,
        "/api/auth/login",
        json!({ "email": db::seed::ADMIN_EMAIL, "password": db::seed::ADMIN_PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
async fn test_projects_endpoints() {
    let app = create_seeded_app().await;

    let (status, body) = get(&app, "/api/projects").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);

    // Seed flags two projects
    let (status, body) = get(&app, "/api/projects/featured").await;
    assert_eq!(status, StatusCode::OK, "featured failed: {}", body);
    let featured = body["projects"].as_array().unwrap();
    assert_eq!(featured.len(), 2);
    assert!(featured.iter().all(|p| p["featured"] == true));

    let (status, body) = get(&app, "/api/projects/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_projects"], 3);
    assert_eq!(body["stats"]["completed_projects"], 1);
    assert_eq!(body["stats"]["active_projects"], 2);
}

#[tokio::test]
async fn test_seeded_posts_have_consistent_counters() {
    let app = create_seeded_app().await;
    let (_, body) = get(&app, "/api/posts").await;
    for p in body["posts"].as_array().unwrap() {
        assert_eq!(p["likes_count"], p["likes"].as_array().unwrap().len());
        assert_eq!(p["comments_count"], p["comments"].as_array().unwrap().len());
    }
}

#[tokio::test]
async fn test_health() {
    let (app, _pool) = create_test_app();
    let (status, body) = get(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}

// ============================================================================
// PERSISTENCE
// ============================================================================

#[tokio::test]
async fn test_file_store_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("casira.db");

    {
        let pool = db::create_pool(&db_path).unwrap();
        db::run_migrations(&pool).unwrap();
        let app = routes::app(AppState::new(pool, test_config()));
        register(&app, "a@x.com", "secret1").await;
    }

    let pool = db::create_pool(&db_path).unwrap();
    db::run_migrations(&pool).unwrap();
    let app = routes::app(AppState::new(pool, test_config()));
    let (status, _) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "a@x.com", "password": "secret1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
