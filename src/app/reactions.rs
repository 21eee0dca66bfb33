use anyhow::anyhow;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

use crate::app::error::{sqlstate, violated_constraint, ServiceError, FOREIGN_KEY_VIOLATION};
use crate::domain::engagement::{Like, LikeTarget, TargetKind};
use crate::infra::db::Db;

const LIKE_COLUMNS: &str = "id, owner_id, post_id, story_id, news_id, comment_id, created_at";

/// A resolved like target: the row exists, and this is who owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRef {
    pub target: LikeTarget,
    pub owner_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub enum ReactOutcome {
    Created(Like),
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreactOutcome {
    Removed,
    NotFound,
}

/// Likes on posts, stories, news and comments, kept in one table with a
/// typed foreign key per target kind.
#[derive(Clone)]
pub struct ReactionStore {
    db: Db,
}

impl ReactionStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Resolves a path label (`posts`, `stories`, `news`, `comments`) and id.
    pub async fn resolve(&self, kind_label: &str, id: i64) -> Result<EntityRef, ServiceError> {
        let kind = TargetKind::from_label(kind_label)
            .ok_or_else(|| ServiceError::InvalidKind(kind_label.to_string()))?;
        self.resolve_target(LikeTarget::new(kind, id)).await
    }

    pub async fn resolve_target(&self, target: LikeTarget) -> Result<EntityRef, ServiceError> {
        let kind = target.kind();
        let owner_expr = match kind {
            TargetKind::News => "NULL::BIGINT",
            _ => "owner_id",
        };
        let sql = format!(
            "SELECT {} AS owner_id FROM {} WHERE id = $1",
            owner_expr,
            kind.table()
        );

        let row = sqlx::query(&sql)
            .bind(target.id())
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|row| EntityRef {
            target,
            owner_id: row.get("owner_id"),
        })
        .ok_or(ServiceError::NotFound(kind.noun()))
    }

    /// Find-or-create. Concurrent identical calls are absorbed by the per-kind
    /// unique indexes, so at most one row exists per (actor, target).
    pub async fn react(&self, actor_id: i64, entity: EntityRef) -> Result<ReactOutcome, ServiceError> {
        let target = entity.target;
        let sql = format!(
            "INSERT INTO likes (owner_id, {}) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING \
             RETURNING {}",
            target.kind().column(),
            LIKE_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(actor_id)
            .bind(target.id())
            .fetch_optional(self.db.pool())
            .await;

        match row {
            Ok(Some(row)) => {
                let like = like_from_row(&row)?;
                tracing::debug!(
                    like_id = like.id,
                    actor_id,
                    target_kind = target.kind().noun(),
                    target_id = target.id(),
                    "like created"
                );
                Ok(ReactOutcome::Created(like))
            }
            Ok(None) => Ok(ReactOutcome::AlreadyExists),
            // Target or actor deleted after the entity was resolved.
            Err(err) if sqlstate(&err).as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                let constraint = violated_constraint(&err).unwrap_or_default();
                if constraint.contains("owner_id") {
                    Err(ServiceError::NotFound("profile"))
                } else {
                    Err(ServiceError::NotFound(target.kind().noun()))
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn unreact(
        &self,
        actor_id: i64,
        entity: EntityRef,
    ) -> Result<UnreactOutcome, ServiceError> {
        let target = entity.target;
        let sql = format!(
            "DELETE FROM likes WHERE owner_id = $1 AND {} = $2",
            target.kind().column()
        );
        let result = sqlx::query(&sql)
            .bind(actor_id)
            .bind(target.id())
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() > 0 {
            Ok(UnreactOutcome::Removed)
        } else {
            Ok(UnreactOutcome::NotFound)
        }
    }

    pub async fn count(&self, target: LikeTarget) -> Result<i64, ServiceError> {
        let sql = format!(
            "SELECT COUNT(*) FROM likes WHERE {} = $1",
            target.kind().column()
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(target.id())
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn get(&self, like_id: i64) -> Result<Option<Like>, ServiceError> {
        let sql = format!("SELECT {} FROM likes WHERE id = $1", LIKE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(like_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(like_from_row).transpose()
    }

    pub async fn list(
        &self,
        cursor: Option<(OffsetDateTime, i64)>,
        limit: i64,
    ) -> Result<Vec<Like>, ServiceError> {
        let rows = match cursor {
            Some((created_at, like_id)) => {
                let sql = format!(
                    "SELECT {} FROM likes \
                     WHERE (created_at < $1 OR (created_at = $1 AND id < $2)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $3",
                    LIKE_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(created_at)
                    .bind(like_id)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM likes ORDER BY created_at DESC, id DESC LIMIT $1",
                    LIKE_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };

        rows.iter().map(like_from_row).collect()
    }

    pub async fn list_for_target(&self, target: LikeTarget) -> Result<Vec<Like>, ServiceError> {
        let sql = format!(
            "SELECT {} FROM likes WHERE {} = $1 ORDER BY created_at DESC, id DESC",
            LIKE_COLUMNS,
            target.kind().column()
        );
        let rows = sqlx::query(&sql)
            .bind(target.id())
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(like_from_row).collect()
    }

    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Like>, ServiceError> {
        let sql = format!(
            "SELECT {} FROM likes WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
            LIKE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(like_from_row).collect()
    }

    /// Removes a like by id on behalf of its owner.
    pub async fn delete(&self, like_id: i64, actor_id: i64) -> Result<(), ServiceError> {
        let owner_id: Option<i64> = sqlx::query_scalar("SELECT owner_id FROM likes WHERE id = $1")
            .bind(like_id)
            .fetch_optional(self.db.pool())
            .await?;

        match owner_id {
            None => Err(ServiceError::NotFound("like")),
            Some(owner_id) if owner_id != actor_id => {
                Err(ServiceError::forbidden("cannot remove another user's like"))
            }
            Some(_) => {
                sqlx::query("DELETE FROM likes WHERE id = $1")
                    .bind(like_id)
                    .execute(self.db.pool())
                    .await?;
                Ok(())
            }
        }
    }
}

fn like_from_row(row: &PgRow) -> Result<Like, ServiceError> {
    let id: i64 = row.get("id");
    let target = LikeTarget::from_columns(
        row.get("post_id"),
        row.get("story_id"),
        row.get("news_id"),
        row.get("comment_id"),
    )
    .ok_or_else(|| anyhow!("like {} does not reference exactly one target", id))?;

    Ok(Like {
        id,
        owner_id: row.get("owner_id"),
        target_kind: target.kind(),
        target_id: target.id(),
        created_at: row.get("created_at"),
    })
}
