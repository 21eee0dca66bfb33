use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::content::ContentKind;
use crate::domain::locale::LocalizedText;

/// Every kind of row a like can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Story,
    News,
    Comment,
}

impl TargetKind {
    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "posts" | "post" => Some(Self::Post),
            "stories" | "story" => Some(Self::Story),
            "news" => Some(Self::News),
            "comments" | "comment" => Some(Self::Comment),
            _ => None,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Story => "stories",
            Self::News => "news",
            Self::Comment => "comments",
        }
    }

    /// Typed foreign-key column in `likes` for this kind.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Post => "post_id",
            Self::Story => "story_id",
            Self::News => "news_id",
            Self::Comment => "comment_id",
        }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Story => "story",
            Self::News => "news",
            Self::Comment => "comment",
        }
    }
}

impl From<ContentKind> for TargetKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Post => Self::Post,
            ContentKind::Story => Self::Story,
            ContentKind::News => Self::News,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeTarget {
    Post(i64),
    Story(i64),
    News(i64),
    Comment(i64),
}

impl LikeTarget {
    pub fn new(kind: TargetKind, id: i64) -> Self {
        match kind {
            TargetKind::Post => Self::Post(id),
            TargetKind::Story => Self::Story(id),
            TargetKind::News => Self::News(id),
            TargetKind::Comment => Self::Comment(id),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Post(_) => TargetKind::Post,
            Self::Story(_) => TargetKind::Story,
            Self::News(_) => TargetKind::News,
            Self::Comment(_) => TargetKind::Comment,
        }
    }

    pub fn id(&self) -> i64 {
        match *self {
            Self::Post(id) | Self::Story(id) | Self::News(id) | Self::Comment(id) => id,
        }
    }

    /// Rebuilds a target from the four typed columns of a `likes` row.
    pub fn from_columns(
        post_id: Option<i64>,
        story_id: Option<i64>,
        news_id: Option<i64>,
        comment_id: Option<i64>,
    ) -> Option<Self> {
        match (post_id, story_id, news_id, comment_id) {
            (Some(id), None, None, None) => Some(Self::Post(id)),
            (None, Some(id), None, None) => Some(Self::Story(id)),
            (None, None, Some(id), None) => Some(Self::News(id)),
            (None, None, None, Some(id)) => Some(Self::Comment(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Like {
    pub id: i64,
    pub owner_id: i64,
    pub target_kind: TargetKind,
    pub target_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Comments hang off exactly one post or story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentParent {
    Post(i64),
    Story(i64),
}

impl CommentParent {
    /// Accepts the `posts` / `stories` path segment.
    pub fn from_label(value: &str, id: i64) -> Option<Self> {
        match value {
            "posts" => Some(Self::Post(id)),
            "stories" => Some(Self::Story(id)),
            _ => None,
        }
    }

    pub fn from_columns(post_id: Option<i64>, story_id: Option<i64>) -> Option<Self> {
        match (post_id, story_id) {
            (Some(id), None) => Some(Self::Post(id)),
            (None, Some(id)) => Some(Self::Story(id)),
            _ => None,
        }
    }

    pub fn id(&self) -> i64 {
        match *self {
            Self::Post(id) | Self::Story(id) => id,
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Post(_) => ContentKind::Post,
            Self::Story(_) => ContentKind::Story,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::Post(_) => "post_id",
            Self::Story(_) => "story_id",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub owner_id: i64,
    pub parent: CommentParent,
    pub body: LocalizedText,
    pub created_at: OffsetDateTime,
}
