//! Media Upload Tests
//!
//! Covers upload validation. Successful uploads need object storage and are
//! exercised against a live bucket only.

mod common;

use axum::http::StatusCode;
use common::app;

#[tokio::test]
async fn upload_requires_authentication() {
    let app = app().await;

    let resp = app
        .post_bytes("/v1/media?kind=photo", "image/png", vec![1, 2, 3], None)
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn upload_rejects_unknown_kind() {
    let app = app().await;
    let user = app.create_user("media_kind").await;

    let resp = app
        .post_bytes(
            "/v1/media?kind=audio",
            "audio/mpeg",
            vec![1, 2, 3],
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "kind must be photo or video");
}

#[tokio::test]
async fn upload_rejects_empty_file() {
    let app = app().await;
    let user = app.create_user("media_empty").await;

    let resp = app
        .post_bytes("/v1/media?kind=photo", "image/png", vec![], Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "file is empty");
}

#[tokio::test]
async fn upload_rejects_bytes_that_are_not_an_image() {
    let app = app().await;
    let user = app.create_user("media_fake_png").await;

    let resp = app
        .post_bytes(
            "/v1/media?kind=photo",
            "image/png",
            b"definitely not a png".to_vec(),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "file could not be opened as an image");
}

#[tokio::test]
async fn upload_rejects_photo_with_non_image_type() {
    let app = app().await;
    let user = app.create_user("media_bad_type").await;

    let resp = app
        .post_bytes(
            "/v1/media?kind=photo",
            "application/pdf",
            b"%PDF-1.4".to_vec(),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "file must be an image");
}

#[tokio::test]
async fn upload_rejects_video_without_a_container_signature() {
    let app = app().await;
    let user = app.create_user("media_fake_video").await;

    let resp = app
        .post_bytes(
            "/v1/media?kind=video",
            "video/mp4",
            b"plain text pretending to be video".to_vec(),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "file must be a video");
}
