use anyhow::anyhow;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::app::error::ServiceError;
use crate::app::translation::Materializer;
use crate::domain::engagement::{Comment, CommentParent};
use crate::domain::locale::LocalizedText;
use crate::domain::user::{Actor, OwnerSummary};
use crate::infra::db::Db;

const COMMENT_SELECT: &str = "SELECT cm.id, cm.owner_id, cm.post_id, cm.story_id, \
        cm.body, cm.body_en, cm.body_ru, cm.body_uz, cm.created_at, \
        u.username AS owner_username, pr.avatar_key AS owner_avatar_key, \
        (SELECT COUNT(*) FROM likes l WHERE l.comment_id = cm.id) AS likes_count \
     FROM comments cm \
     JOIN profiles pr ON pr.id = cm.owner_id \
     JOIN users u ON u.id = pr.user_id";

#[derive(Debug, Clone)]
pub struct CommentEntry {
    pub comment: Comment,
    pub owner: OwnerSummary,
    pub likes_count: i64,
}

#[derive(Clone)]
pub struct CommentService {
    db: Db,
    materializer: Materializer,
}

impl CommentService {
    pub fn new(db: Db, materializer: Materializer) -> Self {
        Self { db, materializer }
    }

    /// Parses the parent path segment and checks that the parent exists.
    pub async fn resolve_parent(&self, label: &str, id: i64) -> Result<CommentParent, ServiceError> {
        let parent = CommentParent::from_label(label, id)
            .ok_or_else(|| ServiceError::InvalidKind(label.to_string()))?;

        let kind = parent.kind();
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", kind.table());
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(parent.id())
            .fetch_one(self.db.pool())
            .await?;

        if exists {
            Ok(parent)
        } else {
            Err(ServiceError::NotFound(kind.noun()))
        }
    }

    pub async fn list(&self, parent: CommentParent) -> Result<Vec<CommentEntry>, ServiceError> {
        let sql = format!(
            "{} WHERE cm.{} = $1 ORDER BY cm.created_at DESC, cm.id DESC",
            COMMENT_SELECT,
            parent.column()
        );
        let rows = sqlx::query(&sql)
            .bind(parent.id())
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(entry_from_row).collect()
    }

    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<CommentEntry>, ServiceError> {
        let sql = format!(
            "{} WHERE cm.owner_id = $1 ORDER BY cm.created_at DESC, cm.id DESC",
            COMMENT_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(entry_from_row).collect()
    }

    pub async fn get(&self, parent: CommentParent, id: i64) -> Result<CommentEntry, ServiceError> {
        let sql = format!("{} WHERE cm.id = $1 AND cm.{} = $2", COMMENT_SELECT, parent.column());
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(parent.id())
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(ServiceError::NotFound("comment"))?;

        entry_from_row(&row)
    }

    pub async fn create(
        &self,
        actor: &Actor,
        parent: CommentParent,
        body: String,
    ) -> Result<CommentEntry, ServiceError> {
        let body = validate_body(body)?;
        let body = self.materializer.materialize(LocalizedText::new(body)).await?;

        let sql = format!(
            "INSERT INTO comments (owner_id, {}, body, body_en, body_ru, body_uz) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            parent.column()
        );
        let id: i64 = sqlx::query_scalar(&sql)
            .bind(actor.profile_id)
            .bind(parent.id())
            .bind(&body.source)
            .bind(&body.en)
            .bind(&body.ru)
            .bind(&body.uz)
            .fetch_one(self.db.pool())
            .await?;

        tracing::info!(comment_id = id, profile_id = actor.profile_id, "comment created");
        self.get(parent, id).await
    }

    pub async fn update(
        &self,
        actor: &Actor,
        parent: CommentParent,
        id: i64,
        body: String,
    ) -> Result<CommentEntry, ServiceError> {
        let existing = self.get(parent, id).await?;
        ensure_owner(actor, &existing.comment)?;

        let body = validate_body(body)?;
        let body = self.materializer.materialize(LocalizedText::new(body)).await?;

        sqlx::query(
            "UPDATE comments SET body = $2, body_en = $3, body_ru = $4, body_uz = $5 WHERE id = $1",
        )
        .bind(id)
        .bind(&body.source)
        .bind(&body.en)
        .bind(&body.ru)
        .bind(&body.uz)
        .execute(self.db.pool())
        .await?;

        self.get(parent, id).await
    }

    pub async fn delete(&self, actor: &Actor, parent: CommentParent, id: i64) -> Result<(), ServiceError> {
        let existing = self.get(parent, id).await?;
        ensure_owner(actor, &existing.comment)?;

        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}

fn validate_body(body: String) -> Result<String, ServiceError> {
    if body.trim().is_empty() {
        return Err(ServiceError::validation("body is required"));
    }
    Ok(body)
}

fn ensure_owner(actor: &Actor, comment: &Comment) -> Result<(), ServiceError> {
    if comment.owner_id == actor.profile_id {
        Ok(())
    } else {
        Err(ServiceError::forbidden("only the owner can modify this comment"))
    }
}

fn entry_from_row(row: &PgRow) -> Result<CommentEntry, ServiceError> {
    let id: i64 = row.get("id");
    let parent = CommentParent::from_columns(row.get("post_id"), row.get("story_id"))
        .ok_or_else(|| anyhow!("comment {} does not reference exactly one parent", id))?;
    let owner_id: i64 = row.get("owner_id");

    Ok(CommentEntry {
        comment: Comment {
            id,
            owner_id,
            parent,
            body: LocalizedText {
                source: row.get("body"),
                en: row.get("body_en"),
                ru: row.get("body_ru"),
                uz: row.get("body_uz"),
            },
            created_at: row.get("created_at"),
        },
        owner: OwnerSummary {
            id: owner_id,
            username: row.get("owner_username"),
            avatar_key: row.get("owner_avatar_key"),
        },
        likes_count: row.get("likes_count"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn blank_bodies_are_rejected() {
        assert!(validate_body("   ".to_string()).is_err());
        assert_eq!(validate_body("nice".to_string()).unwrap(), "nice");
    }

    #[test]
    fn only_the_author_may_edit() {
        let comment = Comment {
            id: 1,
            owner_id: 7,
            parent: CommentParent::Post(3),
            body: LocalizedText::new("hi"),
            created_at: OffsetDateTime::now_utc(),
        };
        let author = Actor { user_id: 70, profile_id: 7, is_staff: false };
        let staff = Actor { user_id: 80, profile_id: 8, is_staff: true };

        assert!(ensure_owner(&author, &comment).is_ok());
        assert!(matches!(ensure_owner(&staff, &comment), Err(ServiceError::Forbidden(_))));
    }
}
