use serde::{Deserialize, Serialize};

/// Languages every translatable field is materialized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Ru,
    Uz,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::En, Locale::Ru, Locale::Uz];

    pub fn from_code(value: &str) -> Option<Self> {
        match value {
            "en" => Some(Self::En),
            "ru" => Some(Self::Ru),
            "uz" => Some(Self::Uz),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
            Self::Uz => "uz",
        }
    }
}

/// A source-language text field plus its stored translations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedText {
    pub source: String,
    pub en: Option<String>,
    pub ru: Option<String>,
    pub uz: Option<String>,
}

impl LocalizedText {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn get(&self, locale: Locale) -> Option<&str> {
        match locale {
            Locale::En => self.en.as_deref(),
            Locale::Ru => self.ru.as_deref(),
            Locale::Uz => self.uz.as_deref(),
        }
    }

    pub fn set(&mut self, locale: Locale, value: String) {
        match locale {
            Locale::En => self.en = Some(value),
            Locale::Ru => self.ru = Some(value),
            Locale::Uz => self.uz = Some(value),
        }
    }

    /// The variant for `locale`, falling back to the source text.
    pub fn display(&self, locale: Locale) -> &str {
        match self.get(locale) {
            Some(value) if !value.is_empty() => value,
            _ => &self.source,
        }
    }
}
