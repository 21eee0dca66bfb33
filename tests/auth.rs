//! Authentication Tests
//!
//! Covers registration, login, token refresh, logout, password change, and
//! the admin staff switch.

mod common;

use axum::http::StatusCode;
use common::{app, DEFAULT_PASSWORD};
use serde_json::json;
use uuid::Uuid;

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

// ===========================================================================
// Registration
// ===========================================================================

#[tokio::test]
async fn register_creates_user_and_profile() {
    let app = app().await;
    let username = unique("auth_reg");

    let resp = app
        .post_json(
            "/v1/register",
            json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": DEFAULT_PASSWORD,
                "first_name": "Ada",
            }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["user"]["username"], username.as_str());
    assert_eq!(body["user"]["is_staff"], false);
    assert!(body["profile_id"].is_i64());
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());

    let resp = app
        .get(&format!("/v1/users/{}", body["profile_id"]), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["user"]["first_name"], "Ada");
}

#[tokio::test]
async fn register_duplicate_username() {
    let app = app().await;
    let existing = app.create_user("auth_dup").await;

    let resp = app
        .post_json(
            "/v1/register",
            json!({
                "username": existing.username,
                "email": format!("{}@example.com", unique("other")),
                "password": DEFAULT_PASSWORD,
            }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "username already taken");
}

#[tokio::test]
async fn register_duplicate_email() {
    let app = app().await;
    let existing = app.create_user("auth_dup_mail").await;

    let resp = app
        .post_json(
            "/v1/register",
            json!({
                "username": unique("auth_fresh"),
                "email": existing.email,
                "password": DEFAULT_PASSWORD,
            }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "email already registered");
}

#[tokio::test]
async fn register_short_password() {
    let app = app().await;
    let username = unique("auth_short");

    let resp = app
        .post_json(
            "/v1/register",
            json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "short",
            }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "password must be at least 8 characters");
}

#[tokio::test]
async fn users_collection_does_not_create_accounts() {
    let app = app().await;

    let resp = app
        .post_json("/v1/users", json!({ "username": "nobody" }), None)
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

// ===========================================================================
// Login
// ===========================================================================

#[tokio::test]
async fn login_with_username_or_email() {
    let app = app().await;
    let user = app.create_user("auth_login").await;

    let resp = app
        .post_json(
            "/v1/login",
            json!({ "username": user.username, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.json()["access_token"].is_string());

    let resp = app
        .post_json(
            "/v1/login",
            json!({ "email": user.email, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn login_wrong_password() {
    let app = app().await;
    let user = app.create_user("auth_badpw").await;

    let resp = app
        .post_json(
            "/v1/login",
            json!({ "login": user.username, "password": "wrongpassword" }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "invalid credentials");
}

#[tokio::test]
async fn login_empty_fields() {
    let app = app().await;

    let resp = app
        .post_json("/v1/login", json!({ "login": "", "password": "" }), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Tokens
// ===========================================================================

#[tokio::test]
async fn refresh_rotates_the_token() {
    let app = app().await;
    let user = app.create_user("auth_refresh").await;

    let resp = app
        .post_json(
            "/v1/auth/refresh",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let rotated = resp.json()["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(rotated, user.refresh_token);

    let resp = app
        .post_json(
            "/v1/auth/refresh",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_malformed_token() {
    let app = app().await;

    let resp = app
        .post_json(
            "/v1/auth/refresh",
            json!({ "refresh_token": "not-a-token" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_refresh_token() {
    let app = app().await;
    let user = app.create_user("auth_logout").await;

    let resp = app
        .post_json(
            "/v1/logout",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .post_json(
            "/v1/auth/refresh",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_route_rejects_bad_tokens() {
    let app = app().await;

    let resp = app.get("/v1/en/likes", None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app.get("/v1/en/likes", Some("garbage")).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_revokes_sessions() {
    let app = app().await;
    let user = app.create_user("auth_chpw").await;

    let resp = app
        .post_json(
            "/v1/password/change",
            json!({ "old_password": "wrongpassword", "new_password": "brandnewpass" }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "current password is incorrect");

    let resp = app
        .post_json(
            "/v1/password/change",
            json!({ "old_password": DEFAULT_PASSWORD, "new_password": "brandnewpass" }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .post_json(
            "/v1/auth/refresh",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app
        .post_json(
            "/v1/login",
            json!({ "login": user.username, "password": "brandnewpass" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

// ===========================================================================
// Admin
// ===========================================================================

#[tokio::test]
async fn staff_switch_requires_admin_token() {
    let app = app().await;
    let user = app.create_user("auth_admin").await;
    let path = format!("/v1/admin/users/{}/staff", user.profile_id);

    let resp = app.post_admin(&path, json!({ "is_staff": true }), None).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post_admin(&path, json!({ "is_staff": true }), Some("wrong-token"))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post_admin(&path, json!({ "is_staff": true }), Some(app.admin_token()))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .post_admin(
            "/v1/admin/users/999999999/staff",
            json!({ "is_staff": true }),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
