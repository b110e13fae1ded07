use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::sync::Arc;
use taskboard_server::auth::encode_jwt;
use taskboard_server::config::Config;
use taskboard_server::entities::sea_orm_active_enums::UserRole;
use taskboard_server::web::{AppState, create_app};
use testcontainers_modules::{postgres, testcontainers};
use tower::ServiceExt;

mod common;

const JWT_SECRET: &str = "test_secret";

pub struct TestContext {
    #[allow(dead_code)] // container is kept to ensure it's not dropped
    pub container: testcontainers::ContainerAsync<postgres::Postgres>,
    pub db: DatabaseConnection,
    pub app: Router,
}

async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let container = common::setup_container().await?;
    let db = common::setup_db(&container).await?;
    let state = Arc::new(AppState {
        config: Arc::new(Config {
            db_url: "".to_string(),
            port: 8080,
            jwt_secret: JWT_SECRET.to_string(),
        }),
        db: Arc::new(db.clone()),
    });
    let app = create_app(state);
    Ok(TestContext { container, db, app })
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body should be JSON")
}

fn register_body(email: &str) -> Value {
    json!({
        "email": email,
        "password": "long-enough-password",
        "name": "Test User",
    })
}

#[tokio::test]
async fn can_register_with_valid_input() {
    let state = setup().await.expect("Failed to setup test context");

    let response = state
        .app
        .oneshot(json_request(
            "POST",
            "/api/users/register",
            None,
            Some(register_body("new@example.com")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["user"]["email"], "new@example.com");
    assert_eq!(body["user"]["name"], "Test User");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));
}

#[tokio::test]
async fn can_reject_short_passwords() {
    let state = setup().await.expect("Failed to setup test context");

    let response = state
        .app
        .oneshot(json_request(
            "POST",
            "/api/users/register",
            None,
            Some(json!({
                "email": "new@example.com",
                "password": "short",
                "name": "Test User",
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Invalid input data");
}

#[tokio::test]
async fn can_reject_duplicate_emails() {
    let state = setup().await.expect("Failed to setup test context");

    let response = state
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/users/register",
            None,
            Some(register_body("taken@example.com")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = state
        .app
        .oneshot(json_request(
            "POST",
            "/api/users/register",
            None,
            Some(register_body("taken@example.com")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn can_login_and_fetch_own_profile() {
    let state = setup().await.expect("Failed to setup test context");

    let response = state
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/users/register",
            None,
            Some(register_body("login@example.com")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = state
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/users/login",
            None,
            Some(json!({
                "email": "login@example.com",
                "password": "long-enough-password",
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["user"]["email"], "login@example.com");
    let token = body["token"].as_str().expect("Token should be a string");

    let response = state
        .app
        .oneshot(json_request(
            "GET",
            "/api/users/profile",
            Some(token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["email"], "login@example.com");
    assert_eq!(body["role"], "user");
    assert!(body["id"].is_string());
    // The stored password hash is never exposed
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn can_reject_wrong_passwords() {
    let state = setup().await.expect("Failed to setup test context");

    let response = state
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/users/register",
            None,
            Some(register_body("victim@example.com")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = state
        .app
        .oneshot(json_request(
            "POST",
            "/api/users/login",
            None,
            Some(json!({
                "email": "victim@example.com",
                "password": "not-the-password",
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn can_reject_unknown_emails_with_the_same_message() {
    let state = setup().await.expect("Failed to setup test context");

    let response = state
        .app
        .oneshot(json_request(
            "POST",
            "/api/users/login",
            None,
            Some(json!({
                "email": "nobody@example.com",
                "password": "whatever-password",
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn profile_requires_authentication() {
    let state = setup().await.expect("Failed to setup test context");

    let response = state
        .app
        .oneshot(json_request("GET", "/api/users/profile", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Please authenticate");
}

#[tokio::test]
async fn only_admins_can_list_users() {
    let state = setup().await.expect("Failed to setup test context");
    let member = common::seed_user(&state.db, "Member", "member@example.com", UserRole::User)
        .await
        .unwrap();
    let admin = common::seed_user(&state.db, "Admin", "admin@example.com", UserRole::Admin)
        .await
        .unwrap();

    let member_token = encode_jwt(member.id, UserRole::User, JWT_SECRET).await.unwrap();
    let response = state
        .app
        .clone()
        .oneshot(json_request("GET", "/api/users", Some(&member_token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Access denied");

    let admin_token = encode_jwt(admin.id, UserRole::Admin, JWT_SECRET).await.unwrap();
    let response = state
        .app
        .oneshot(json_request("GET", "/api/users", Some(&admin_token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let users = body.as_array().expect("Response should be an array");
    let emails: Vec<&str> = users
        .iter()
        .filter_map(|user| user["email"].as_str())
        .collect();
    assert!(emails.contains(&"member@example.com"));
    assert!(emails.contains(&"admin@example.com"));
}

#[tokio::test]
async fn health_check_is_public() {
    let state = setup().await.expect("Failed to setup test context");

    let response = state
        .app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes, "OK");
}

#[tokio::test]
async fn tokens_from_deleted_accounts_are_rejected() {
    let state = setup().await.expect("Failed to setup test context");

    // A structurally valid token whose account does not exist
    let token = encode_jwt(uuid::Uuid::new_v4(), UserRole::User, JWT_SECRET)
        .await
        .unwrap();

    let response = state
        .app
        .oneshot(json_request("GET", "/api/users/profile", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Please authenticate");
}
