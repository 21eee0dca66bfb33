//! Profile Tests
//!
//! Covers profile listing, detail, update, and account deletion.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;

#[tokio::test]
async fn list_profiles_includes_new_user() {
    let app = app().await;
    let user = app.create_user("users_list").await;

    let resp = app.get("/v1/users", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let found = resp
        .json()
        .as_array()
        .unwrap()
        .iter()
        .any(|profile| profile["id"] == user.profile_id);
    assert!(found);
}

#[tokio::test]
async fn profile_detail_includes_content_and_likes() {
    let app = app().await;
    let user = app.create_user("users_detail").await;

    let post = app.create_post(&user, "mine", "body").await;
    app.create_story(&user, "my story").await;
    app.post_json(
        &format!("/v1/en/posts/{}/like", post["id"]),
        json!({}),
        Some(&user.access_token),
    )
    .await;

    let resp = app.get(&format!("/v1/users/{}", user.profile_id), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["user"]["username"], user.username.as_str());
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    assert_eq!(body["posts"][0]["title"], "mine");
    assert_eq!(body["stories"].as_array().unwrap().len(), 1);
    assert_eq!(body["likes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn get_missing_profile() {
    let app = app().await;

    let resp = app.get("/v1/users/999999999", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_own_profile() {
    let app = app().await;
    let user = app.create_user("users_update").await;

    let resp = app
        .patch_json(
            &format!("/v1/users/{}", user.profile_id),
            json!({ "first_name": "Grace", "avatar_key": "avatars/1.png" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["user"]["first_name"], "Grace");
    assert_eq!(body["user"]["username"], user.username.as_str());
    assert_eq!(body["avatar_key"], "avatars/1.png");
}

#[tokio::test]
async fn update_other_profile_is_forbidden() {
    let app = app().await;
    let owner = app.create_user("users_owner").await;
    let other = app.create_user("users_other").await;

    let resp = app
        .patch_json(
            &format!("/v1/users/{}", owner.profile_id),
            json!({ "first_name": "Mallory" }),
            Some(&other.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn update_to_taken_username_conflicts() {
    let app = app().await;
    let first = app.create_user("users_taken_a").await;
    let second = app.create_user("users_taken_b").await;

    let resp = app
        .patch_json(
            &format!("/v1/users/{}", second.profile_id),
            json!({ "username": first.username }),
            Some(&second.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "username already taken");
}

#[tokio::test]
async fn delete_account_invalidates_tokens() {
    let app = app().await;
    let user = app.create_user("users_delete").await;

    let resp = app
        .delete(&format!("/v1/users/{}", user.profile_id), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get(&format!("/v1/users/{}", user.profile_id), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app.get("/v1/en/likes", Some(&user.access_token)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}
