#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use hitlist_api::auth::jwt::{generate_access_token, JwtConfig};
use hitlist_api::auth::password::hash_password;
use hitlist_api::config::ServerConfig;
use hitlist_api::middleware::actor::SESSION_HEADER;
use hitlist_api::router::build_app_router;
use hitlist_api::state::AppState;
use hitlist_db::models::user::{CreateUser, User};
use hitlist_db::repositories::UserRepo;

pub const TEST_PASSWORD: &str = "test_password_123!";
const BOUNDARY: &str = "hitlist-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
        claim_lock_timeout_ms: 2_000,
        expiry_interval_secs: 300,
        export_worker_identity: false,
        jwt: JwtConfig {
            secret: "test-secret-not-for-production".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// Build the full application router, as `main.rs` does, over `pool`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

/// [`build_test_app`] with a caller-supplied config.
pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a user with [`TEST_PASSWORD`] and return it with a valid token.
pub async fn create_user(pool: &PgPool, username: &str, role: &str) -> (User, String) {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@test.com"),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            role: role.to_string(),
        },
    )
    .await
    .unwrap();
    let token = generate_access_token(user.id, role, &test_config().jwt).unwrap();
    (user, token)
}

/// Start a worker session and return its token.
pub async fn start_session(app: &Router, token: Option<&str>) -> String {
    let response = send(app, Method::POST, "/api/v1/sessions", token, None, Body::empty(), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["data"]["token"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    session: Option<&str>,
    body: Body,
    content_type: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(session) = session {
        builder = builder.header(SESSION_HEADER, session);
    }
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None, Body::empty(), None).await
}

pub async fn get_with(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    session: Option<&str>,
) -> Response {
    send(app, Method::GET, uri, token, session, Body::empty(), None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    post_json_with(app, uri, body, None, None).await
}

pub async fn post_json_with(
    app: &Router,
    uri: &str,
    body: Value,
    token: Option<&str>,
    session: Option<&str>,
) -> Response {
    send(
        app,
        Method::POST,
        uri,
        token,
        session,
        Body::from(body.to_string()),
        Some("application/json"),
    )
    .await
}

pub async fn put_json_with(app: &Router, uri: &str, body: Value, token: Option<&str>) -> Response {
    send(
        app,
        Method::PUT,
        uri,
        token,
        None,
        Body::from(body.to_string()),
        Some("application/json"),
    )
    .await
}

/// POST with an empty body.
pub async fn post_with(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    session: Option<&str>,
) -> Response {
    send(app, Method::POST, uri, token, session, Body::empty(), None).await
}

/// POST an `application/x-www-form-urlencoded` body.
pub async fn post_form_with(
    app: &Router,
    uri: &str,
    form: &str,
    token: Option<&str>,
    session: Option<&str>,
) -> Response {
    send(
        app,
        Method::POST,
        uri,
        token,
        session,
        Body::from(form.to_string()),
        Some("application/x-www-form-urlencoded"),
    )
    .await
}

pub async fn delete_with(app: &Router, uri: &str, token: Option<&str>) -> Response {
    send(app, Method::DELETE, uri, token, None, Body::empty(), None).await
}

/// One part of a multipart form.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    /// Field name, file name, contents.
    File(&'a str, &'a str, &'a str),
}

pub async fn post_multipart(app: &Router, uri: &str, parts: &[Part<'_>], token: &str) -> Response {
    let mut body = String::new();
    for part in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match part {
            Part::Text(name, value) => {
                body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                ));
            }
            Part::File(name, filename, contents) => {
                body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: text/csv\r\n\r\n{contents}\r\n"
                ));
            }
        }
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    let content_type = format!("multipart/form-data; boundary={BOUNDARY}");

    send(
        app,
        Method::POST,
        uri,
        Some(token),
        None,
        Body::from(body),
        Some(content_type.as_str()),
    )
    .await
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
