//! HTTP-level tests for login, user management and worker groups.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create_user, delete_with, get_with, post_json, post_json_with,
    put_json_with, TEST_PASSWORD,
};
use hitlist_api::auth::bootstrap::ensure_admin;
use hitlist_db::repositories::UserRepo;
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_returns_token_and_user(pool: PgPool) {
    let (user, _) = create_user(&pool, "alice", "worker").await;
    let app = build_test_app(pool.clone());

    let response = post_json(
        &app,
        "/api/v1/auth/login",
        json!({ "username": "alice", "password": TEST_PASSWORD }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert_eq!(json["expires_in"], 3600);
    assert_eq!(json["user"]["id"], user.id);
    assert_eq!(json["user"]["role"], "worker");
    assert!(json["user"].get("password_hash").is_none());

    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(user.last_login_at.is_some());

    // The issued token works against a protected endpoint.
    let token = json["access_token"].as_str().unwrap();
    let response = get_with(&app, "/api/v1/auth/me", Some(token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["username"], "alice");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_with_wrong_password_is_401(pool: PgPool) {
    create_user(&pool, "bob", "worker").await;
    let app = build_test_app(pool);

    let response = post_json(
        &app,
        "/api/v1/auth/login",
        json!({ "username": "bob", "password": "incorrect_password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        &app,
        "/api/v1/auth/login",
        json!({ "username": "nobody", "password": "incorrect_password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivated_user_cannot_log_in(pool: PgPool) {
    let (user, _) = create_user(&pool, "carol", "worker").await;
    UserRepo::deactivate(&pool, user.id).await.unwrap();
    let app = build_test_app(pool);

    let response = post_json(
        &app,
        "/api/v1/auth/login",
        json!({ "username": "carol", "password": TEST_PASSWORD }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_requires_a_valid_token(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get_with(&app, "/api/v1/auth/me", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_with(&app, "/api/v1/auth/me", Some("garbage"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bootstrap_admin_only_on_empty_database(pool: PgPool) {
    assert!(ensure_admin(&pool, "root", "bootstrap-password").await.unwrap());
    assert!(!ensure_admin(&pool, "root2", "bootstrap-password").await.unwrap());

    let admin = UserRepo::find_by_username(&pool, "root").await.unwrap().unwrap();
    assert_eq!(admin.role, "admin");
    assert!(UserRepo::find_by_username(&pool, "root2").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// User management
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_creates_and_deactivates_users(pool: PgPool) {
    let (admin, admin_token) = create_user(&pool, "admin", "admin").await;
    let app = build_test_app(pool);

    let response = post_json_with(
        &app,
        "/api/v1/admin/users",
        json!({
            "username": "requester1",
            "email": "requester1@test.com",
            "password": "long-enough-password",
            "role": "requester",
        }),
        Some(admin_token.as_str()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["role"], "requester");

    let response = put_json_with(
        &app,
        &format!("/api/v1/admin/users/{id}"),
        json!({ "role": "worker" }),
        Some(admin_token.as_str()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["role"], "worker");

    let response = delete_with(&app, &format!("/api/v1/admin/users/{id}"), Some(admin_token.as_str())).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete_with(
        &app,
        &format!("/api/v1/admin/users/{}", admin.id),
        Some(admin_token.as_str()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn user_creation_reports_all_field_errors(pool: PgPool) {
    let (_, admin_token) = create_user(&pool, "admin", "admin").await;
    let app = build_test_app(pool);

    let response = post_json_with(
        &app,
        "/api/v1/admin/users",
        json!({
            "username": "",
            "email": "not-an-email",
            "password": "long-enough-password",
            "role": "worker",
        }),
        Some(admin_token.as_str()),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["details"].as_array().unwrap().len(), 2);

    let response = post_json_with(
        &app,
        "/api/v1/admin/users",
        json!({
            "username": "shorty",
            "email": "shorty@test.com",
            "password": "short",
            "role": "worker",
        }),
        Some(admin_token.as_str()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_with(
        &app,
        "/api/v1/admin/users",
        json!({
            "username": "wizard",
            "email": "wizard@test.com",
            "password": "long-enough-password",
            "role": "wizard",
        }),
        Some(admin_token.as_str()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_admins_cannot_manage_users(pool: PgPool) {
    let (_, requester_token) = create_user(&pool, "req", "requester").await;
    let (_, worker_token) = create_user(&pool, "wrk", "worker").await;
    let app = build_test_app(pool);

    for token in [requester_token.as_str(), worker_token.as_str()] {
        let response = get_with(&app, "/api/v1/admin/users", Some(token), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

// ---------------------------------------------------------------------------
// Worker groups
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn groups_track_their_members(pool: PgPool) {
    let (_, admin_token) = create_user(&pool, "admin", "admin").await;
    let (w1, _) = create_user(&pool, "w1", "worker").await;
    let (w2, _) = create_user(&pool, "w2", "worker").await;
    let app = build_test_app(pool);

    let response = post_json_with(
        &app,
        "/api/v1/admin/groups",
        json!({ "name": "Annotators", "user_ids": [w1.id] }),
        Some(admin_token.as_str()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let group = body_json(response).await;
    let id = group["data"]["id"].as_i64().unwrap();
    assert_eq!(group["data"]["total_members"], 1);

    let response = put_json_with(
        &app,
        &format!("/api/v1/admin/groups/{id}/members"),
        json!({ "user_ids": [w1.id, w2.id] }),
        Some(admin_token.as_str()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["total_members"], 2);

    let response = get_with(
        &app,
        &format!("/api/v1/admin/groups/{id}/members"),
        Some(admin_token.as_str()),
        None,
    )
    .await;
    let members = body_json(response).await;
    assert_eq!(members["data"].as_array().unwrap().len(), 2);

    // Group names are unique.
    let response = post_json_with(
        &app,
        "/api/v1/admin/groups",
        json!({ "name": "Annotators" }),
        Some(admin_token.as_str()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = delete_with(&app, &format!("/api/v1/admin/groups/{id}"), Some(admin_token.as_str())).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
