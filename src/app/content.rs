use anyhow::anyhow;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

use crate::app::error::ServiceError;
use crate::app::translation::Materializer;
use crate::domain::content::{Content, ContentDraft, ContentKind, MediaKind};
use crate::domain::locale::{Locale, LocalizedText};
use crate::domain::user::{Actor, OwnerSummary};
use crate::infra::db::Db;

pub const MAX_TITLE_CHARS: usize = 100;

/// A content row plus the aggregates every response carries.
#[derive(Debug, Clone)]
pub struct ContentEntry {
    pub content: Content,
    pub owner: Option<OwnerSummary>,
    pub likes_count: i64,
    pub comments_count: i64,
}

/// Posts, stories and news. All three share one code path keyed by
/// `ContentKind`; stories have no body and news has no owner.
#[derive(Clone)]
pub struct ContentService {
    db: Db,
    materializer: Materializer,
}

impl ContentService {
    pub fn new(db: Db, materializer: Materializer) -> Self {
        Self { db, materializer }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        kind: ContentKind,
        draft: ContentDraft,
    ) -> Result<ContentEntry, ServiceError> {
        if kind == ContentKind::News && !actor.is_staff {
            return Err(ServiceError::forbidden("only staff can publish news"));
        }
        let draft = normalize_draft(kind, draft)?;

        let draft = self.materializer.materialize(draft).await?;

        let mut columns = vec!["media_kind", "src_key", "title", "title_en", "title_ru", "title_uz"];
        if kind.has_body() {
            columns.extend(["body", "body_en", "body_ru", "body_uz"]);
        }
        if kind.has_owner() {
            columns.push("owner_id");
        }
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
            kind.table(),
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql)
            .bind(draft.media_kind.as_db())
            .bind(&draft.src_key)
            .bind(&draft.title.source)
            .bind(&draft.title.en)
            .bind(&draft.title.ru)
            .bind(&draft.title.uz);
        if let Some(body) = draft.body.as_ref() {
            query = query
                .bind(&body.source)
                .bind(&body.en)
                .bind(&body.ru)
                .bind(&body.uz);
        }
        if kind.has_owner() {
            query = query.bind(actor.profile_id);
        }

        let id = query.fetch_one(self.db.pool()).await?;
        tracing::info!(
            kind = kind.noun(),
            id,
            profile_id = actor.profile_id,
            "content created"
        );

        self.get(kind, id).await
    }

    pub async fn get(&self, kind: ContentKind, id: i64) -> Result<ContentEntry, ServiceError> {
        let sql = format!("{} WHERE c.id = $1", select_sql(kind));
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(ServiceError::NotFound(kind.noun()))?;

        entry_from_row(kind, &row)
    }

    /// Newest-first listing restricted to rows translated into `locale`.
    pub async fn list(
        &self,
        kind: ContentKind,
        locale: Locale,
        cursor: Option<(OffsetDateTime, i64)>,
        limit: i64,
    ) -> Result<Vec<ContentEntry>, ServiceError> {
        let filter = locale_filter(kind, locale);
        let rows = match cursor {
            Some((created_at, id)) => {
                let sql = format!(
                    "{} WHERE {} \
                       AND (c.created_at < $1 OR (c.created_at = $1 AND c.id < $2)) \
                     ORDER BY c.created_at DESC, c.id DESC \
                     LIMIT $3",
                    select_sql(kind),
                    filter
                );
                sqlx::query(&sql)
                    .bind(created_at)
                    .bind(id)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
            None => {
                let sql = format!(
                    "{} WHERE {} ORDER BY c.created_at DESC, c.id DESC LIMIT $1",
                    select_sql(kind),
                    filter
                );
                sqlx::query(&sql)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };

        rows.iter().map(|row| entry_from_row(kind, row)).collect()
    }

    pub async fn list_by_owner(
        &self,
        kind: ContentKind,
        owner_id: i64,
    ) -> Result<Vec<ContentEntry>, ServiceError> {
        if !kind.has_owner() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "{} WHERE c.owner_id = $1 ORDER BY c.created_at DESC, c.id DESC",
            select_sql(kind)
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(|row| entry_from_row(kind, row)).collect()
    }

    /// Full replacement. The new text is translated again even when unchanged.
    pub async fn update(
        &self,
        actor: &Actor,
        kind: ContentKind,
        id: i64,
        draft: ContentDraft,
    ) -> Result<ContentEntry, ServiceError> {
        let owner_id = self.owner_of(kind, id).await?;
        authorize_write(actor, kind, owner_id)?;
        let draft = normalize_draft(kind, draft)?;

        let draft = self.materializer.materialize(draft).await?;

        let mut assignments = vec![
            "media_kind = $2",
            "src_key = $3",
            "title = $4",
            "title_en = $5",
            "title_ru = $6",
            "title_uz = $7",
        ];
        if kind.has_body() {
            assignments.extend(["body = $8", "body_en = $9", "body_ru = $10", "body_uz = $11"]);
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE id = $1",
            kind.table(),
            assignments.join(", ")
        );

        let mut query = sqlx::query(&sql)
            .bind(id)
            .bind(draft.media_kind.as_db())
            .bind(&draft.src_key)
            .bind(&draft.title.source)
            .bind(&draft.title.en)
            .bind(&draft.title.ru)
            .bind(&draft.title.uz);
        if let Some(body) = draft.body.as_ref() {
            query = query
                .bind(&body.source)
                .bind(&body.en)
                .bind(&body.ru)
                .bind(&body.uz);
        }

        let result = query.execute(self.db.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(kind.noun()));
        }

        self.get(kind, id).await
    }

    pub async fn delete(&self, actor: &Actor, kind: ContentKind, id: i64) -> Result<(), ServiceError> {
        let owner_id = self.owner_of(kind, id).await?;
        authorize_write(actor, kind, owner_id)?;

        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        sqlx::query(&sql).bind(id).execute(self.db.pool()).await?;

        tracing::info!(kind = kind.noun(), id, profile_id = actor.profile_id, "content deleted");
        Ok(())
    }

    async fn owner_of(&self, kind: ContentKind, id: i64) -> Result<Option<i64>, ServiceError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            owner_expr(kind),
            kind.table()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(ServiceError::NotFound(kind.noun()))?;

        Ok(row.get(0))
    }
}

/// Trims the source text and checks the draft against the kind's shape. The
/// trimmed text is what gets translated and stored.
fn normalize_draft(kind: ContentKind, mut draft: ContentDraft) -> Result<ContentDraft, ServiceError> {
    draft.title.source = draft.title.source.trim().to_string();
    if let Some(body) = draft.body.as_mut() {
        body.source = body.source.trim().to_string();
    }

    let title = draft.title.source.as_str();
    if title.is_empty() {
        return Err(ServiceError::validation("title is required"));
    }
    if kind != ContentKind::Story && title.chars().count() > MAX_TITLE_CHARS {
        return Err(ServiceError::validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    if draft.src_key.trim().is_empty() {
        return Err(ServiceError::validation("src is required"));
    }
    match (kind.has_body(), draft.body.as_ref()) {
        (true, None) => Err(ServiceError::validation("body is required")),
        (true, Some(body)) if body.source.is_empty() => {
            Err(ServiceError::validation("body is required"))
        }
        (false, Some(_)) => Err(ServiceError::validation(format!(
            "{} does not have a body",
            kind.noun()
        ))),
        _ => Ok(draft),
    }
}

/// News is managed by staff; everything else only by its owner.
fn authorize_write(actor: &Actor, kind: ContentKind, owner_id: Option<i64>) -> Result<(), ServiceError> {
    match kind {
        ContentKind::News if actor.is_staff => Ok(()),
        ContentKind::News => Err(ServiceError::forbidden("only staff can manage news")),
        _ if owner_id == Some(actor.profile_id) => Ok(()),
        _ => Err(ServiceError::forbidden(format!(
            "only the owner can modify this {}",
            kind.noun()
        ))),
    }
}

fn owner_expr(kind: ContentKind) -> &'static str {
    if kind.has_owner() {
        "owner_id"
    } else {
        "NULL::BIGINT AS owner_id"
    }
}

fn select_sql(kind: ContentKind) -> String {
    let body = if kind.has_body() {
        "c.body, c.body_en, c.body_ru, c.body_uz"
    } else {
        "NULL::TEXT AS body, NULL::TEXT AS body_en, NULL::TEXT AS body_ru, NULL::TEXT AS body_uz"
    };
    let (owner, owner_join) = if kind.has_owner() {
        (
            "c.owner_id, u.username AS owner_username, pr.avatar_key AS owner_avatar_key",
            "LEFT JOIN profiles pr ON pr.id = c.owner_id LEFT JOIN users u ON u.id = pr.user_id",
        )
    } else {
        (
            "NULL::BIGINT AS owner_id, NULL::TEXT AS owner_username, NULL::TEXT AS owner_avatar_key",
            "",
        )
    };
    let comments_count = match kind {
        ContentKind::Post => "(SELECT COUNT(*) FROM comments cm WHERE cm.post_id = c.id)",
        ContentKind::Story => "(SELECT COUNT(*) FROM comments cm WHERE cm.story_id = c.id)",
        ContentKind::News => "0::BIGINT",
    };
    let likes_column = crate::domain::engagement::TargetKind::from(kind).column();

    format!(
        "SELECT c.id, c.media_kind, c.src_key, \
                c.title, c.title_en, c.title_ru, c.title_uz, \
                {body}, {owner}, c.created_at, \
                (SELECT COUNT(*) FROM likes l WHERE l.{likes_column} = c.id) AS likes_count, \
                {comments_count} AS comments_count \
         FROM {table} c {owner_join}",
        body = body,
        owner = owner,
        likes_column = likes_column,
        comments_count = comments_count,
        table = kind.table(),
        owner_join = owner_join,
    )
}

fn locale_filter(kind: ContentKind, locale: Locale) -> String {
    let code = locale.code();
    if kind.has_body() {
        format!(
            "NULLIF(c.title_{code}, '') IS NOT NULL AND NULLIF(c.body_{code}, '') IS NOT NULL",
            code = code
        )
    } else {
        format!("NULLIF(c.title_{}, '') IS NOT NULL", code)
    }
}

fn entry_from_row(kind: ContentKind, row: &PgRow) -> Result<ContentEntry, ServiceError> {
    let media_kind: String = row.get("media_kind");
    let media_kind = MediaKind::from_db(&media_kind)
        .ok_or_else(|| anyhow!("unknown media kind: {}", media_kind))?;

    let title = LocalizedText {
        source: row.get("title"),
        en: row.get("title_en"),
        ru: row.get("title_ru"),
        uz: row.get("title_uz"),
    };
    let body = if kind.has_body() {
        Some(LocalizedText {
            source: row.get("body"),
            en: row.get("body_en"),
            ru: row.get("body_ru"),
            uz: row.get("body_uz"),
        })
    } else {
        None
    };

    let owner_id: Option<i64> = row.get("owner_id");
    let owner_username: Option<String> = row.get("owner_username");
    let owner = match (owner_id, owner_username) {
        (Some(id), Some(username)) => Some(OwnerSummary {
            id,
            username,
            avatar_key: row.get("owner_avatar_key"),
        }),
        _ => None,
    };

    Ok(ContentEntry {
        content: Content {
            id: row.get("id"),
            kind,
            media_kind,
            src_key: row.get("src_key"),
            title,
            body,
            owner_id,
            created_at: row.get("created_at"),
        },
        owner,
        likes_count: row.get("likes_count"),
        comments_count: row.get("comments_count"),
    })
}
