use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub subscriber_id: i64,
    pub subscribed_to_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub subscriber_subscribed_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub subscribed_date: OffsetDateTime,
}
