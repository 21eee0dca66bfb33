use axum::extract::DefaultBodyLimit;
use axum::{routing::get, routing::post, Router};
use tower_http::limit::RequestBodyLimitLayer;

use crate::AppState;
use crate::http::handlers;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/password/change", post(handlers::change_password))
        .route("/admin/users/:id/staff", post(handlers::set_staff))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/:id",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/users/:id/subscribe",
            get(handlers::subscribers_count).post(handlers::subscribe),
        )
        .route(
            "/users/:id/unsubscribe",
            get(handlers::subscribers_count).post(handlers::unsubscribe),
        )
}

pub fn media(upload_max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/media", post(handlers::upload_media))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_max_bytes))
}

/// Everything under `/{lang}`: posts, stories, news, their comments, and likes.
pub fn localized() -> Router<AppState> {
    Router::new()
        .route(
            "/:lang/likes",
            get(handlers::list_likes).post(handlers::create_like),
        )
        .route(
            "/:lang/likes/:id",
            get(handlers::get_like).delete(handlers::delete_like),
        )
        .route(
            "/:lang/:kind",
            get(handlers::list_content).post(handlers::create_content),
        )
        .route(
            "/:lang/:kind/:id",
            get(handlers::get_content)
                .put(handlers::update_content)
                .delete(handlers::delete_content),
        )
        .route(
            "/:lang/:kind/:id/like",
            get(handlers::content_likes_count).post(handlers::like_content),
        )
        .route(
            "/:lang/:kind/:id/unlike",
            get(handlers::content_likes_count).post(handlers::unlike_content),
        )
        .route(
            "/:lang/:kind/:id/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route(
            "/:lang/:kind/:id/comments/:comment_id",
            get(handlers::get_comment)
                .put(handlers::update_comment)
                .patch(handlers::update_comment)
                .delete(handlers::delete_comment),
        )
        .route(
            "/:lang/:kind/:id/comments/:comment_id/like",
            get(handlers::comment_likes_count).post(handlers::like_comment),
        )
        .route(
            "/:lang/:kind/:id/comments/:comment_id/unlike",
            get(handlers::comment_likes_count).post(handlers::unlike_comment),
        )
}
