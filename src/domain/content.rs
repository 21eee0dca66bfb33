use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::locale::{Locale, LocalizedText};

/// The content tables that carry media plus localized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Story,
    News,
}

impl ContentKind {
    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "posts" | "post" => Some(Self::Post),
            "stories" | "story" => Some(Self::Story),
            "news" => Some(Self::News),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Story => "stories",
            Self::News => "news",
        }
    }

    pub fn table(&self) -> &'static str {
        self.label()
    }

    pub fn has_body(&self) -> bool {
        !matches!(self, Self::Story)
    }

    pub fn has_owner(&self) -> bool {
        !matches!(self, Self::News)
    }

    pub fn accepts_comments(&self) -> bool {
        !matches!(self, Self::News)
    }

    /// Human-readable singular noun used in API messages.
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Story => "story",
            Self::News => "news",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Accepts the canonical labels and the localized labels older clients send.
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "photo" | "Photo" | "Фото" | "Foto" => Some(Self::Photo),
            "video" | "Video" | "Видео" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "photo" => Some(Self::Photo),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }

    pub fn display(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Photo, Locale::Ru) => "Фото",
            (Self::Photo, Locale::En) => "Photo",
            (Self::Photo, Locale::Uz) => "Foto",
            (Self::Video, Locale::Ru) => "Видео",
            (Self::Video, Locale::En | Locale::Uz) => "Video",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Content {
    pub id: i64,
    pub kind: ContentKind,
    pub media_kind: MediaKind,
    pub src_key: String,
    pub title: LocalizedText,
    pub body: Option<LocalizedText>,
    pub owner_id: Option<i64>,
    pub created_at: OffsetDateTime,
}

/// Content as submitted by a client, before translation.
#[derive(Debug, Clone)]
pub struct ContentDraft {
    pub media_kind: MediaKind,
    pub src_key: String,
    pub title: LocalizedText,
    pub body: Option<LocalizedText>,
}
