use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::app::error::{sqlstate, ServiceError, FOREIGN_KEY_VIOLATION};
use crate::domain::social_graph::Subscription;
use crate::domain::user::OwnerSummary;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Unsubscribed,
    NotSubscribed,
}

/// The profile on the other side of a subscription, with both dates.
#[derive(Debug, Clone)]
pub struct SubscriptionEdge {
    pub profile: OwnerSummary,
    pub subscription: Subscription,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionCounts {
    pub subscribers: i64,
    pub subscribes: i64,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn subscribe(
        &self,
        subscriber_id: i64,
        target_id: i64,
    ) -> Result<SubscribeOutcome, ServiceError> {
        if subscriber_id == target_id {
            return Err(ServiceError::validation("you cannot subscribe to yourself"));
        }

        let result = sqlx::query(
            "INSERT INTO subscriptions (subscriber_id, subscribed_to_id) \
             VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(subscriber_id)
        .bind(target_id)
        .execute(self.db.pool())
        .await;

        match result {
            Ok(result) if result.rows_affected() > 0 => {
                tracing::info!(subscriber_id, target_id, "subscribed");
                Ok(SubscribeOutcome::Subscribed)
            }
            Ok(_) => Ok(SubscribeOutcome::AlreadySubscribed),
            Err(err) if sqlstate(&err).as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                Err(ServiceError::NotFound("profile"))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn unsubscribe(
        &self,
        subscriber_id: i64,
        target_id: i64,
    ) -> Result<UnsubscribeOutcome, ServiceError> {
        if subscriber_id == target_id {
            return Err(ServiceError::validation("you cannot unsubscribe from yourself"));
        }

        let result = sqlx::query(
            "DELETE FROM subscriptions WHERE subscriber_id = $1 AND subscribed_to_id = $2",
        )
        .bind(subscriber_id)
        .bind(target_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(subscriber_id, target_id, "unsubscribed");
            Ok(UnsubscribeOutcome::Unsubscribed)
        } else {
            Ok(UnsubscribeOutcome::NotSubscribed)
        }
    }

    pub async fn subscribers_count(&self, profile_id: i64) -> Result<i64, ServiceError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE subscribed_to_id = $1")
                .bind(profile_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(count)
    }

    pub async fn counts(&self, profile_id: i64) -> Result<SubscriptionCounts, ServiceError> {
        let row = sqlx::query(
            "SELECT \
                (SELECT COUNT(*) FROM subscriptions WHERE subscribed_to_id = $1) AS subscribers, \
                (SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1) AS subscribes",
        )
        .bind(profile_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(SubscriptionCounts {
            subscribers: row.get("subscribers"),
            subscribes: row.get("subscribes"),
        })
    }

    /// Profiles subscribed to `profile_id`, newest first.
    pub async fn subscribers(&self, profile_id: i64) -> Result<Vec<SubscriptionEdge>, ServiceError> {
        let rows = sqlx::query(
            "SELECT s.subscriber_id, s.subscribed_to_id, s.subscriber_subscribed_date, s.subscribed_date, \
                    p.id AS profile_id, u.username, p.avatar_key \
             FROM subscriptions s \
             JOIN profiles p ON p.id = s.subscriber_id \
             JOIN users u ON u.id = p.user_id \
             WHERE s.subscribed_to_id = $1 \
             ORDER BY s.subscribed_date DESC, p.id DESC",
        )
        .bind(profile_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(edge_from_row).collect())
    }

    /// Profiles `profile_id` is subscribed to, newest first.
    pub async fn subscribes(&self, profile_id: i64) -> Result<Vec<SubscriptionEdge>, ServiceError> {
        let rows = sqlx::query(
            "SELECT s.subscriber_id, s.subscribed_to_id, s.subscriber_subscribed_date, s.subscribed_date, \
                    p.id AS profile_id, u.username, p.avatar_key \
             FROM subscriptions s \
             JOIN profiles p ON p.id = s.subscribed_to_id \
             JOIN users u ON u.id = p.user_id \
             WHERE s.subscriber_id = $1 \
             ORDER BY s.subscribed_date DESC, p.id DESC",
        )
        .bind(profile_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(edge_from_row).collect())
    }
}

fn edge_from_row(row: &PgRow) -> SubscriptionEdge {
    SubscriptionEdge {
        profile: OwnerSummary {
            id: row.get("profile_id"),
            username: row.get("username"),
            avatar_key: row.get("avatar_key"),
        },
        subscription: Subscription {
            subscriber_id: row.get("subscriber_id"),
            subscribed_to_id: row.get("subscribed_to_id"),
            subscriber_subscribed_date: row.get("subscriber_subscribed_date"),
            subscribed_date: row.get("subscribed_date"),
        },
    }
}
