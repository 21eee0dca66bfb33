use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Account identity. Password hashes never leave the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

/// The actor: owns content, issues likes and subscriptions.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: i64,
    pub user: User,
    pub avatar_key: Option<String>,
    pub banner_key: Option<String>,
}

/// Compact owner block embedded in content and comment responses.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerSummary {
    pub id: i64,
    pub username: String,
    pub avatar_key: Option<String>,
}

/// The authenticated caller as the services see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub profile_id: i64,
    pub is_staff: bool,
}
