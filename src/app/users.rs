use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::app::error::{map_unique_violation, ServiceError};
use crate::domain::user::{Actor, Profile, User};
use crate::infra::db::Db;

const PROFILE_SELECT: &str = "SELECT p.id, p.avatar_key, p.banner_key, \
        u.id AS user_id, u.username, u.email, u.first_name, u.last_name, u.is_staff, u.date_joined \
     FROM profiles p \
     JOIN users u ON u.id = p.user_id";

/// Partial profile edit. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_key: Option<String>,
    pub banner_key: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Profile>, ServiceError> {
        let sql = format!("{} ORDER BY u.date_joined DESC, p.id DESC", PROFILE_SELECT);
        let rows = sqlx::query(&sql).fetch_all(self.db.pool()).await?;
        Ok(rows.iter().map(profile_from_row).collect())
    }

    pub async fn get(&self, profile_id: i64) -> Result<Profile, ServiceError> {
        let sql = format!("{} WHERE p.id = $1", PROFILE_SELECT);
        let row = sqlx::query(&sql)
            .bind(profile_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(ServiceError::NotFound("profile"))?;

        Ok(profile_from_row(&row))
    }

    pub async fn update(
        &self,
        actor: &Actor,
        profile_id: i64,
        update: ProfileUpdate,
    ) -> Result<Profile, ServiceError> {
        let profile = self.get(profile_id).await?;
        if profile.id != actor.profile_id {
            return Err(ServiceError::forbidden("you can only edit your own profile"));
        }
        validate_update(&update)?;

        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            "UPDATE users \
             SET username = COALESCE($2, username), \
                 email = COALESCE($3, email), \
                 first_name = COALESCE($4, first_name), \
                 last_name = COALESCE($5, last_name) \
             WHERE id = $1",
        )
        .bind(profile.user.id)
        .bind(update.username.as_deref().map(str::trim))
        .bind(update.email.as_deref().map(str::trim))
        .bind(update.first_name)
        .bind(update.last_name)
        .execute(&mut *tx)
        .await;

        if let Err(err) = result {
            return Err(map_unique_violation(err));
        }

        sqlx::query(
            "UPDATE profiles \
             SET avatar_key = COALESCE($2, avatar_key), \
                 banner_key = COALESCE($3, banner_key) \
             WHERE id = $1",
        )
        .bind(profile_id)
        .bind(update.avatar_key)
        .bind(update.banner_key)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get(profile_id).await
    }

    /// Deletes the account; profiles, content, comments, likes and
    /// subscriptions go with it through the foreign keys.
    pub async fn delete(&self, actor: &Actor, profile_id: i64) -> Result<(), ServiceError> {
        let profile = self.get(profile_id).await?;
        if profile.id != actor.profile_id {
            return Err(ServiceError::forbidden("you can only delete your own profile"));
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(profile.user.id)
            .execute(self.db.pool())
            .await?;

        tracing::info!(profile_id, user_id = profile.user.id, "account deleted");
        Ok(())
    }
}

fn validate_update(update: &ProfileUpdate) -> Result<(), ServiceError> {
    if let Some(username) = update.username.as_deref() {
        if username.trim().is_empty() {
            return Err(ServiceError::validation("username cannot be empty"));
        }
    }
    if let Some(email) = update.email.as_deref() {
        if !email.contains('@') {
            return Err(ServiceError::validation("email is invalid"));
        }
    }
    Ok(())
}

fn profile_from_row(row: &PgRow) -> Profile {
    Profile {
        id: row.get("id"),
        user: User {
            id: row.get("user_id"),
            username: row.get("username"),
            email: row.get("email"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            is_staff: row.get("is_staff"),
            date_joined: row.get("date_joined"),
        },
        avatar_key: row.get("avatar_key"),
        banner_key: row.get("banner_key"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_username_and_malformed_email() {
        let update = ProfileUpdate {
            username: Some("  ".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(validate_update(&update).is_err());

        let update = ProfileUpdate {
            email: Some("nope".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(validate_update(&update).is_err());

        assert!(validate_update(&ProfileUpdate::default()).is_ok());
    }
}
