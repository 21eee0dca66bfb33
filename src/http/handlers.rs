use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::app::auth::{NewAccount, TokenPair};
use crate::app::comments::{CommentEntry, CommentService};
use crate::app::content::{ContentEntry, ContentService};
use crate::app::error::{map_unique_violation, ServiceError};
use crate::app::media::{MediaService, StoredMedia};
use crate::app::reactions::{EntityRef, ReactOutcome, ReactionStore, UnreactOutcome};
use crate::app::social::{SocialService, SubscribeOutcome, SubscriptionEdge, UnsubscribeOutcome};
use crate::app::users::{ProfileUpdate, UserService};
use crate::domain::content::{ContentDraft, ContentKind, MediaKind};
use crate::domain::engagement::{CommentParent, Like, LikeTarget, TargetKind};
use crate::domain::locale::{Locale, LocalizedText};
use crate::domain::user::{OwnerSummary, Profile, User};
use crate::http::{AdminToken, AppError, AuthUser};
use crate::AppState;

const MAX_PASSWORD_LEN: usize = 128;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn page_limit(limit: Option<i64>) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(30);
    if !(1..=200).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 200"));
    }
    Ok(limit)
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, i64)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = id.parse::<i64>().map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, i64)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

/// Trims a `limit + 1` fetch down to `limit` and derives the next cursor
/// from the last row kept.
fn paginate<T>(
    mut items: Vec<T>,
    limit: i64,
    key: impl Fn(&T) -> (OffsetDateTime, i64),
) -> (Vec<T>, Option<String>) {
    let limit = limit as usize;
    if items.len() <= limit {
        return (items, None);
    }
    items.truncate(limit);
    let next = items.last().map(key);
    (items, encode_cursor(next))
}

fn parse_locale(lang: &str) -> Result<Locale, AppError> {
    Locale::from_code(lang).ok_or_else(|| ServiceError::InvalidLocale(lang.to_string()).into())
}

fn parse_content_kind(label: &str) -> Result<ContentKind, AppError> {
    ContentKind::from_label(label).ok_or_else(|| ServiceError::InvalidKind(label.to_string()).into())
}

fn parse_target_kind(label: &str) -> Result<TargetKind, AppError> {
    TargetKind::from_label(label).ok_or_else(|| ServiceError::InvalidKind(label.to_string()).into())
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

// ---- accounts ----

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Serialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expires_at: OffsetDateTime,
}

impl From<TokenPair> for AuthTokenResponse {
    fn from(tokens: TokenPair) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        }
    }
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub profile_id: i64,
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokenResponse,
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.trim().len() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at least 8 characters"));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::bad_request("username cannot be empty"));
    }
    if !payload.email.contains('@') {
        return Err(AppError::bad_request("email is invalid"));
    }
    validate_password(&payload.password)?;

    let registration = state
        .auth_service()
        .register(NewAccount {
            username: payload.username,
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            password: payload.password,
        })
        .await
        .map_err(|err| match err.downcast::<sqlx::Error>() {
            Ok(db_err) => AppError::from(map_unique_violation(db_err)),
            Err(err) => {
                tracing::error!(error = ?err, "failed to register account");
                AppError::internal("failed to register account")
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            profile_id: registration.profile_id,
            user: registration.user,
            tokens: registration.tokens.into(),
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    pub login: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.login.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("login and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let tokens = state
        .auth_service()
        .login(&payload.login, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match tokens {
        Some(tokens) => Ok(Json(tokens.into())),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let tokens = state
        .auth_service()
        .refresh(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to refresh token");
            AppError::internal("failed to refresh token")
        })?;

    match tokens {
        Some(tokens) => Ok(Json(tokens.into())),
        None => Err(AppError::unauthorized("invalid refresh token")),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<StatusCode, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let revoked = state
        .auth_service()
        .revoke_refresh_token(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to revoke token");
            AppError::internal("failed to logout")
        })?;

    tracing::debug!(revoked, "logout");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    validate_password(&payload.new_password)?;

    let changed = state
        .auth_service()
        .change_password(auth.user_id, &payload.old_password, &payload.new_password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, "failed to change password");
            AppError::internal("failed to change password")
        })?;

    if changed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::bad_request("current password is incorrect"))
    }
}

#[derive(Deserialize)]
pub struct SetStaffRequest {
    pub is_staff: bool,
}

pub async fn set_staff(
    _admin: AdminToken,
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<SetStaffRequest>,
) -> Result<StatusCode, AppError> {
    let updated = state
        .auth_service()
        .set_staff(id, payload.is_staff)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, profile_id = id, "failed to update staff flag");
            AppError::internal("failed to update staff flag")
        })?;

    if updated {
        tracing::info!(profile_id = id, is_staff = payload.is_staff, "staff flag updated");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("profile not found"))
    }
}

// ---- profiles and subscriptions ----

#[derive(Serialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub profile: OwnerSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub subscriber_subscribed_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub subscribed_date: OffsetDateTime,
}

impl From<SubscriptionEdge> for SubscriptionResponse {
    fn from(edge: SubscriptionEdge) -> Self {
        Self {
            profile: edge.profile,
            subscriber_subscribed_date: edge.subscription.subscriber_subscribed_date,
            subscribed_date: edge.subscription.subscribed_date,
        }
    }
}

#[derive(Serialize)]
pub struct ProfileDetailResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub posts: Vec<ContentResponse>,
    pub stories: Vec<ContentResponse>,
    pub comments: Vec<CommentResponse>,
    pub likes: Vec<Like>,
    pub subscribers: Vec<SubscriptionResponse>,
    pub subscribers_count: i64,
    pub subscribes: Vec<SubscriptionResponse>,
    pub subscribes_count: i64,
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<Profile>>, AppError> {
    let profiles = UserService::new(state.db.clone()).list().await?;
    Ok(Json(profiles))
}

pub async fn create_user() -> Result<StatusCode, AppError> {
    Err(AppError::forbidden("accounts are created through POST /v1/register"))
}

pub async fn get_user(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ProfileDetailResponse>, AppError> {
    let profile = UserService::new(state.db.clone()).get(id).await?;

    let content = ContentService::new(state.db.clone(), state.materializer());
    let posts = content.list_by_owner(ContentKind::Post, id).await?;
    let stories = content.list_by_owner(ContentKind::Story, id).await?;
    let comments = CommentService::new(state.db.clone(), state.materializer())
        .list_by_owner(id)
        .await?;
    let likes = ReactionStore::new(state.db.clone()).list_by_owner(id).await?;

    let social = SocialService::new(state.db.clone());
    let subscribers = social.subscribers(id).await?;
    let subscribes = social.subscribes(id).await?;
    let counts = social.counts(id).await?;

    Ok(Json(ProfileDetailResponse {
        profile,
        posts: posts.into_iter().map(|entry| ContentResponse::new(entry, None)).collect(),
        stories: stories.into_iter().map(|entry| ContentResponse::new(entry, None)).collect(),
        comments: comments.into_iter().map(|entry| CommentResponse::new(entry, None)).collect(),
        likes,
        subscribers: subscribers.into_iter().map(Into::into).collect(),
        subscribers_count: counts.subscribers,
        subscribes: subscribes.into_iter().map(Into::into).collect(),
        subscribes_count: counts.subscribes,
    }))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_key: Option<String>,
    pub banner_key: Option<String>,
}

pub async fn update_user(
    Path(id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    let profile = UserService::new(state.db.clone())
        .update(
            &auth.actor(),
            id,
            ProfileUpdate {
                username: payload.username,
                email: payload.email,
                first_name: payload.first_name,
                last_name: payload.last_name,
                avatar_key: payload.avatar_key,
                banner_key: payload.banner_key,
            },
        )
        .await?;

    Ok(Json(profile))
}

pub async fn delete_user(
    Path(id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    UserService::new(state.db.clone())
        .delete(&auth.actor(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct SubscribersCountResponse {
    pub subscribers_count: i64,
}

pub async fn subscribers_count(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<SubscribersCountResponse>, AppError> {
    UserService::new(state.db.clone()).get(id).await?;
    let subscribers_count = SocialService::new(state.db.clone())
        .subscribers_count(id)
        .await?;
    Ok(Json(SubscribersCountResponse { subscribers_count }))
}

pub async fn subscribe(
    Path(id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let target = UserService::new(state.db.clone()).get(id).await?;
    let outcome = SocialService::new(state.db.clone())
        .subscribe(auth.profile_id, target.id)
        .await?;

    let message = match outcome {
        SubscribeOutcome::Subscribed => format!("you subscribed to {}", target.user.username),
        SubscribeOutcome::AlreadySubscribed => {
            format!("you are already subscribed to {}", target.user.username)
        }
    };
    Ok(Json(MessageResponse { message }))
}

pub async fn unsubscribe(
    Path(id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let target = UserService::new(state.db.clone()).get(id).await?;
    let outcome = SocialService::new(state.db.clone())
        .unsubscribe(auth.profile_id, target.id)
        .await?;

    let message = match outcome {
        UnsubscribeOutcome::Unsubscribed => format!("you unsubscribed from {}", target.user.username),
        UnsubscribeOutcome::NotSubscribed => {
            format!("you are not subscribed to {}", target.user.username)
        }
    };
    Ok(Json(MessageResponse { message }))
}

// ---- media ----

#[derive(Deserialize)]
pub struct UploadQuery {
    pub kind: String,
}

pub async fn upload_media(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<StoredMedia>), AppError> {
    let media_kind = MediaKind::from_label(&query.kind)
        .ok_or_else(|| AppError::bad_request("kind must be photo or video"))?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::bad_request("Content-Type header is required"))?;
    let content_type = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();

    let stored = MediaService::new(state.storage.clone())
        .upload(auth.profile_id, media_kind, &content_type, body)
        .await?;

    Ok((StatusCode::CREATED, Json(stored)))
}

// ---- posts, stories, news ----

#[derive(Serialize)]
pub struct ContentResponse {
    pub id: i64,
    pub kind: ContentKind,
    pub media_kind: MediaKind,
    #[serde(rename = "type")]
    pub type_label: &'static str,
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_url: Option<String>,
    pub title: String,
    pub title_en: Option<String>,
    pub title_ru: Option<String>,
    pub title_uz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_ru: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_uz: Option<String>,
    pub owner: Option<OwnerSummary>,
    pub likes_count: i64,
    pub comments_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ContentResponse {
    /// Without a locale the source text and canonical media label are shown.
    fn new(entry: ContentEntry, locale: Option<Locale>) -> Self {
        let content = entry.content;
        let (title, body) = match locale {
            Some(locale) => (
                content.title.display(locale).to_string(),
                content.body.as_ref().map(|body| body.display(locale).to_string()),
            ),
            None => (
                content.title.source.clone(),
                content.body.as_ref().map(|body| body.source.clone()),
            ),
        };
        let type_label = match locale {
            Some(locale) => content.media_kind.display(locale),
            None => content.media_kind.as_db(),
        };
        let LocalizedText { en, ru, uz, .. } = content.title;
        let (body_en, body_ru, body_uz) = match content.body {
            Some(body) => (body.en, body.ru, body.uz),
            None => (None, None, None),
        };

        Self {
            id: content.id,
            kind: content.kind,
            media_kind: content.media_kind,
            type_label,
            src: content.src_key,
            src_url: None,
            title,
            title_en: en,
            title_ru: ru,
            title_uz: uz,
            body,
            body_en,
            body_ru,
            body_uz,
            owner: entry.owner,
            likes_count: entry.likes_count,
            comments_count: entry.comments_count,
            created_at: content.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ContentDetailResponse {
    #[serde(flatten)]
    pub content: ContentResponse,
    pub comments: Vec<CommentResponse>,
    pub likes: Vec<Like>,
}

#[derive(Deserialize)]
pub struct ContentRequest {
    #[serde(rename = "type", alias = "media_kind")]
    pub media_type: String,
    pub src: String,
    pub title: String,
    pub body: Option<String>,
}

impl ContentRequest {
    fn into_draft(self) -> Result<ContentDraft, AppError> {
        let media_kind = MediaKind::from_label(&self.media_type)
            .ok_or_else(|| AppError::bad_request("type must be photo or video"))?;
        Ok(ContentDraft {
            media_kind,
            src_key: self.src,
            title: LocalizedText::new(self.title),
            body: self.body.map(LocalizedText::new),
        })
    }
}

async fn with_src_url(state: &AppState, mut response: ContentResponse) -> ContentResponse {
    response.src_url = MediaService::new(state.storage.clone())
        .src_url(&response.src)
        .await;
    response
}

pub async fn list_content(
    Path((lang, kind)): Path<(String, String)>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<ContentResponse>>, AppError> {
    let locale = parse_locale(&lang)?;
    let kind = parse_content_kind(&kind)?;
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let entries = ContentService::new(state.db.clone(), state.materializer())
        .list(kind, locale, cursor, limit + 1)
        .await?;
    let (entries, next_cursor) = paginate(entries, limit, |entry| {
        (entry.content.created_at, entry.content.id)
    });

    Ok(Json(ListResponse {
        items: entries
            .into_iter()
            .map(|entry| ContentResponse::new(entry, Some(locale)))
            .collect(),
        next_cursor,
    }))
}

pub async fn create_content(
    Path((lang, kind)): Path<(String, String)>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ContentRequest>,
) -> Result<(StatusCode, Json<ContentResponse>), AppError> {
    let locale = parse_locale(&lang)?;
    let kind = parse_content_kind(&kind)?;
    let draft = payload.into_draft()?;

    let entry = ContentService::new(state.db.clone(), state.materializer())
        .create(&auth.actor(), kind, draft)
        .await?;

    let response = with_src_url(&state, ContentResponse::new(entry, Some(locale))).await;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_content(
    Path((lang, kind, id)): Path<(String, String, i64)>,
    State(state): State<AppState>,
) -> Result<Json<ContentDetailResponse>, AppError> {
    let locale = parse_locale(&lang)?;
    let kind = parse_content_kind(&kind)?;

    let entry = ContentService::new(state.db.clone(), state.materializer())
        .get(kind, id)
        .await?;

    let comments = match kind {
        ContentKind::Post => Some(CommentParent::Post(id)),
        ContentKind::Story => Some(CommentParent::Story(id)),
        ContentKind::News => None,
    };
    let comments = match comments {
        Some(parent) => {
            CommentService::new(state.db.clone(), state.materializer())
                .list(parent)
                .await?
        }
        None => Vec::new(),
    };
    let likes = ReactionStore::new(state.db.clone())
        .list_for_target(LikeTarget::new(kind.into(), id))
        .await?;

    let content = with_src_url(&state, ContentResponse::new(entry, Some(locale))).await;
    Ok(Json(ContentDetailResponse {
        content,
        comments: comments
            .into_iter()
            .map(|entry| CommentResponse::new(entry, Some(locale)))
            .collect(),
        likes,
    }))
}

pub async fn update_content(
    Path((lang, kind, id)): Path<(String, String, i64)>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ContentRequest>,
) -> Result<Json<ContentResponse>, AppError> {
    let locale = parse_locale(&lang)?;
    let kind = parse_content_kind(&kind)?;
    let draft = payload.into_draft()?;

    let entry = ContentService::new(state.db.clone(), state.materializer())
        .update(&auth.actor(), kind, id, draft)
        .await?;

    Ok(Json(with_src_url(&state, ContentResponse::new(entry, Some(locale))).await))
}

pub async fn delete_content(
    Path((lang, kind, id)): Path<(String, String, i64)>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    parse_locale(&lang)?;
    let kind = parse_content_kind(&kind)?;

    ContentService::new(state.db.clone(), state.materializer())
        .delete(&auth.actor(), kind, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- likes ----

#[derive(Serialize)]
pub struct LikesCountResponse {
    pub likes_count: i64,
}

#[derive(Serialize)]
pub struct ReactResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like: Option<Like>,
    pub likes_count: i64,
}

async fn react_response(
    store: &ReactionStore,
    actor_id: i64,
    entity: EntityRef,
) -> Result<(StatusCode, Json<ReactResponse>), AppError> {
    let outcome = store.react(actor_id, entity).await?;
    let likes_count = store.count(entity.target).await?;

    let (status, message, like) = match outcome {
        ReactOutcome::Created(like) => (StatusCode::CREATED, "liked", Some(like)),
        ReactOutcome::AlreadyExists => (StatusCode::OK, "already liked", None),
    };
    Ok((status, Json(ReactResponse { message, like, likes_count })))
}

async fn unreact_response(
    store: &ReactionStore,
    actor_id: i64,
    entity: EntityRef,
) -> Result<Json<ReactResponse>, AppError> {
    let outcome = store.unreact(actor_id, entity).await?;
    let likes_count = store.count(entity.target).await?;

    let message = match outcome {
        UnreactOutcome::Removed => "unliked",
        UnreactOutcome::NotFound => "not liked",
    };
    Ok(Json(ReactResponse {
        message,
        like: None,
        likes_count,
    }))
}

pub async fn content_likes_count(
    Path((lang, kind, id)): Path<(String, String, i64)>,
    State(state): State<AppState>,
) -> Result<Json<LikesCountResponse>, AppError> {
    parse_locale(&lang)?;
    let store = ReactionStore::new(state.db.clone());
    let entity = store.resolve(&kind, id).await?;
    let likes_count = store.count(entity.target).await?;
    Ok(Json(LikesCountResponse { likes_count }))
}

pub async fn like_content(
    Path((lang, kind, id)): Path<(String, String, i64)>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ReactResponse>), AppError> {
    parse_locale(&lang)?;
    let store = ReactionStore::new(state.db.clone());
    let entity = store.resolve(&kind, id).await?;
    react_response(&store, auth.profile_id, entity).await
}

pub async fn unlike_content(
    Path((lang, kind, id)): Path<(String, String, i64)>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ReactResponse>, AppError> {
    parse_locale(&lang)?;
    let store = ReactionStore::new(state.db.clone());
    let entity = store.resolve(&kind, id).await?;
    unreact_response(&store, auth.profile_id, entity).await
}

#[derive(Deserialize)]
pub struct CreateLikeRequest {
    pub target_kind: String,
    pub target_id: i64,
}

pub async fn list_likes(
    Path(lang): Path<String>,
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Like>>, AppError> {
    parse_locale(&lang)?;
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let likes = ReactionStore::new(state.db.clone())
        .list(cursor, limit + 1)
        .await?;
    let (items, next_cursor) = paginate(likes, limit, |like| (like.created_at, like.id));

    Ok(Json(ListResponse { items, next_cursor }))
}

pub async fn create_like(
    Path(lang): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateLikeRequest>,
) -> Result<(StatusCode, Json<ReactResponse>), AppError> {
    parse_locale(&lang)?;
    let kind = parse_target_kind(&payload.target_kind)?;
    let store = ReactionStore::new(state.db.clone());
    let entity = store
        .resolve_target(LikeTarget::new(kind, payload.target_id))
        .await?;
    react_response(&store, auth.profile_id, entity).await
}

pub async fn get_like(
    Path((lang, id)): Path<(String, i64)>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Like>, AppError> {
    parse_locale(&lang)?;
    let like = ReactionStore::new(state.db.clone())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("like not found"))?;
    Ok(Json(like))
}

pub async fn delete_like(
    Path((lang, id)): Path<(String, i64)>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    parse_locale(&lang)?;
    ReactionStore::new(state.db.clone())
        .delete(id, auth.profile_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- comments ----

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub parent_kind: ContentKind,
    pub parent_id: i64,
    pub body: String,
    pub body_en: Option<String>,
    pub body_ru: Option<String>,
    pub body_uz: Option<String>,
    pub owner: OwnerSummary,
    pub likes_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl CommentResponse {
    fn new(entry: CommentEntry, locale: Option<Locale>) -> Self {
        let comment = entry.comment;
        let body = match locale {
            Some(locale) => comment.body.display(locale).to_string(),
            None => comment.body.source.clone(),
        };

        Self {
            id: comment.id,
            parent_kind: comment.parent.kind(),
            parent_id: comment.parent.id(),
            body,
            body_en: comment.body.en,
            body_ru: comment.body.ru,
            body_uz: comment.body.uz,
            owner: entry.owner,
            likes_count: entry.likes_count,
            created_at: comment.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub body: String,
}

pub async fn list_comments(
    Path((lang, kind, id)): Path<(String, String, i64)>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    let locale = parse_locale(&lang)?;
    let service = CommentService::new(state.db.clone(), state.materializer());
    let parent = service.resolve_parent(&kind, id).await?;

    let comments = service.list(parent).await?;
    Ok(Json(
        comments
            .into_iter()
            .map(|entry| CommentResponse::new(entry, Some(locale)))
            .collect(),
    ))
}

pub async fn create_comment(
    Path((lang, kind, id)): Path<(String, String, i64)>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), AppError> {
    let locale = parse_locale(&lang)?;
    let service = CommentService::new(state.db.clone(), state.materializer());
    let parent = service.resolve_parent(&kind, id).await?;

    let entry = service.create(&auth.actor(), parent, payload.body).await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::new(entry, Some(locale)))))
}

pub async fn get_comment(
    Path((lang, kind, id, comment_id)): Path<(String, String, i64, i64)>,
    State(state): State<AppState>,
) -> Result<Json<CommentResponse>, AppError> {
    let locale = parse_locale(&lang)?;
    let service = CommentService::new(state.db.clone(), state.materializer());
    let parent = service.resolve_parent(&kind, id).await?;

    let entry = service.get(parent, comment_id).await?;
    Ok(Json(CommentResponse::new(entry, Some(locale))))
}

pub async fn update_comment(
    Path((lang, kind, id, comment_id)): Path<(String, String, i64, i64)>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let locale = parse_locale(&lang)?;
    let service = CommentService::new(state.db.clone(), state.materializer());
    let parent = service.resolve_parent(&kind, id).await?;

    let entry = service
        .update(&auth.actor(), parent, comment_id, payload.body)
        .await?;
    Ok(Json(CommentResponse::new(entry, Some(locale))))
}

pub async fn delete_comment(
    Path((lang, kind, id, comment_id)): Path<(String, String, i64, i64)>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    parse_locale(&lang)?;
    let service = CommentService::new(state.db.clone(), state.materializer());
    let parent = service.resolve_parent(&kind, id).await?;

    service.delete(&auth.actor(), parent, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resolves `/{kind}/{id}/comments/{comment_id}` to a like target, checking
/// that the comment belongs to the parent in the path.
async fn comment_target(
    state: &AppState,
    lang: &str,
    kind: &str,
    id: i64,
    comment_id: i64,
) -> Result<EntityRef, AppError> {
    parse_locale(lang)?;
    let service = CommentService::new(state.db.clone(), state.materializer());
    let parent = service.resolve_parent(kind, id).await?;
    let entry = service.get(parent, comment_id).await?;
    Ok(EntityRef {
        target: LikeTarget::Comment(entry.comment.id),
        owner_id: Some(entry.comment.owner_id),
    })
}

pub async fn comment_likes_count(
    Path((lang, kind, id, comment_id)): Path<(String, String, i64, i64)>,
    State(state): State<AppState>,
) -> Result<Json<LikesCountResponse>, AppError> {
    let entity = comment_target(&state, &lang, &kind, id, comment_id).await?;
    let likes_count = ReactionStore::new(state.db.clone())
        .count(entity.target)
        .await?;
    Ok(Json(LikesCountResponse { likes_count }))
}

pub async fn like_comment(
    Path((lang, kind, id, comment_id)): Path<(String, String, i64, i64)>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ReactResponse>), AppError> {
    let entity = comment_target(&state, &lang, &kind, id, comment_id).await?;
    let store = ReactionStore::new(state.db.clone());
    react_response(&store, auth.profile_id, entity).await
}

pub async fn unlike_comment(
    Path((lang, kind, id, comment_id)): Path<(String, String, i64, i64)>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ReactResponse>, AppError> {
    let entity = comment_target(&state, &lang, &kind, id, comment_id).await?;
    let store = ReactionStore::new(state.db.clone());
    unreact_response(&store, auth.profile_id, entity).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn cursor_round_trips() {
        let at = datetime!(2024-03-01 12:30:00 UTC);
        let encoded = encode_cursor(Some((at, 42))).unwrap();
        assert_eq!(encoded, "2024-03-01T12:30:00Z/42");
        assert_eq!(parse_cursor(Some(encoded)).unwrap(), Some((at, 42)));
    }

    #[test]
    fn malformed_cursors_are_rejected() {
        assert!(parse_cursor(Some("nope".to_string())).is_err());
        assert!(parse_cursor(Some("2024-03-01T12:30:00Z/abc".to_string())).is_err());
        assert_eq!(parse_cursor(None).unwrap(), None);
    }

    #[test]
    fn paginate_uses_last_kept_row_as_cursor() {
        let at = datetime!(2024-03-01 00:00:00 UTC);
        let rows = vec![(at, 5), (at, 4), (at, 3)];

        let (page, next) = paginate(rows.clone(), 2, |row| *row);
        assert_eq!(page, vec![(at, 5), (at, 4)]);
        assert_eq!(next.as_deref(), Some("2024-03-01T00:00:00Z/4"));

        let (page, next) = paginate(rows, 3, |row| *row);
        assert_eq!(page.len(), 3);
        assert!(next.is_none());
    }

    #[test]
    fn limits_are_bounded() {
        assert_eq!(page_limit(None).unwrap(), 30);
        assert!(page_limit(Some(0)).is_err());
        assert!(page_limit(Some(201)).is_err());
    }

    #[test]
    fn unknown_locales_and_kinds_are_bad_requests() {
        assert_eq!(parse_locale("de").unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_content_kind("comments").unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_locale("uz").unwrap(), Locale::Uz);
    }
}
