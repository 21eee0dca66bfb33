use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::app::error::ServiceError;
use crate::domain::content::ContentDraft;
use crate::domain::locale::{Locale, LocalizedText};

/// Maps a piece of text into a target language.
///
/// Implementations may be slow, may fail, and are not assumed to be
/// deterministic: translating the same text twice can yield different output.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: Locale) -> Result<String>;
}

/// Client for the public Google `translate_a/single` endpoint (client `gtx`).
pub struct GoogleTranslator {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to create translation HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target: Locale) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let url = format!("{}/translate_a/single", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target.code()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .context("failed to reach translation service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("translation service error {}: {}", status, body);
        }

        let payload: Value = response
            .json()
            .await
            .context("invalid translation response body")?;
        parse_gtx_response(&payload)
    }
}

/// Stores the source text as every translation. Used when `TRANSLATOR=identity`.
pub struct IdentityTranslator;

#[async_trait]
impl Translator for IdentityTranslator {
    async fn translate(&self, text: &str, _target: Locale) -> Result<String> {
        Ok(text.to_string())
    }
}

/// The gtx payload is `[[[translated, original, ...], ...], ...]`; the
/// translation is the concatenation of the first element of every segment.
fn parse_gtx_response(payload: &Value) -> Result<String> {
    let segments = payload
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("translation response missing segments"))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(anyhow!("translation response contained no text"));
    }

    Ok(translated)
}

/// Anything carrying source-language text fields that must be stored in every locale.
pub trait Translatable {
    fn text_fields_mut(&mut self) -> Vec<&mut LocalizedText>;
}

impl Translatable for LocalizedText {
    fn text_fields_mut(&mut self) -> Vec<&mut LocalizedText> {
        vec![self]
    }
}

impl Translatable for ContentDraft {
    fn text_fields_mut(&mut self) -> Vec<&mut LocalizedText> {
        let mut fields = vec![&mut self.title];
        if let Some(body) = self.body.as_mut() {
            fields.push(body);
        }
        fields
    }
}

/// Fills every locale variant of an entity's text fields before it is written.
///
/// Runs on every save, from the fields' current source values, with no
/// caching. Any failed call fails the whole materialization so that nothing
/// is persisted half-translated.
#[derive(Clone)]
pub struct Materializer {
    translator: Arc<dyn Translator>,
}

impl Materializer {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }

    pub async fn materialize<T>(&self, mut entity: T) -> Result<T, ServiceError>
    where
        T: Translatable + Send,
    {
        let sources: Vec<String> = entity
            .text_fields_mut()
            .iter()
            .map(|field| field.source.clone())
            .collect();

        let translator = self.translator.as_ref();
        let mut calls = Vec::with_capacity(sources.len() * Locale::ALL.len());
        for (index, source) in sources.iter().enumerate() {
            for locale in Locale::ALL {
                calls.push(async move {
                    translator
                        .translate(source, locale)
                        .await
                        .with_context(|| format!("failed to translate into {}", locale.code()))
                        .map(|text| (index, locale, text))
                });
            }
        }

        let translated = futures::future::try_join_all(calls).await.map_err(|err| {
            tracing::warn!(error = ?err, "translation failed, rejecting write");
            ServiceError::Translation(err)
        })?;

        let mut fields = entity.text_fields_mut();
        for (index, locale, text) in translated {
            fields[index].set(locale, text);
        }
        drop(fields);

        tracing::debug!(fields = sources.len(), "materialized translations");
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::MediaKind;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTranslator {
        calls: Mutex<Vec<(String, Locale)>>,
    }

    impl RecordingTranslator {
        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Translator for RecordingTranslator {
        async fn translate(&self, text: &str, target: Locale) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), target));
            Ok(format!("[{}] {}", target.code(), text))
        }
    }

    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        async fn translate(&self, _text: &str, target: Locale) -> Result<String> {
            if target == Locale::Uz {
                anyhow::bail!("quota exceeded");
            }
            Ok("ok".to_string())
        }
    }

    fn draft(body: Option<&str>) -> ContentDraft {
        ContentDraft {
            media_kind: MediaKind::Photo,
            src_key: "src/1/a.png".to_string(),
            title: LocalizedText::new("Hello"),
            body: body.map(LocalizedText::new),
        }
    }

    #[tokio::test]
    async fn fills_three_variants_per_field() {
        let translator = Arc::new(RecordingTranslator::default());
        let materializer = Materializer::new(translator.clone());

        let result = materializer.materialize(draft(Some("World"))).await.unwrap();

        assert_eq!(result.title.en.as_deref(), Some("[en] Hello"));
        assert_eq!(result.title.ru.as_deref(), Some("[ru] Hello"));
        assert_eq!(result.title.uz.as_deref(), Some("[uz] Hello"));
        let body = result.body.unwrap();
        assert_eq!(body.en.as_deref(), Some("[en] World"));
        assert_eq!(body.source, "World");
        assert_eq!(translator.call_count(), 6);
    }

    #[tokio::test]
    async fn body_less_entities_translate_title_only() {
        let translator = Arc::new(RecordingTranslator::default());
        let materializer = Materializer::new(translator.clone());

        let result = materializer.materialize(draft(None)).await.unwrap();

        assert!(result.body.is_none());
        assert_eq!(translator.call_count(), 3);
    }

    #[tokio::test]
    async fn resaving_unchanged_text_translates_again() {
        let translator = Arc::new(RecordingTranslator::default());
        let materializer = Materializer::new(translator.clone());

        let first = materializer.materialize(LocalizedText::new("Hello")).await.unwrap();
        assert_eq!(translator.call_count(), 3);

        let second = materializer.materialize(first).await.unwrap();
        assert_eq!(translator.call_count(), 6);
        assert_eq!(second.source, "Hello");
        assert_eq!(second.ru.as_deref(), Some("[ru] Hello"));

        let calls = translator.calls.lock().unwrap();
        assert!(calls.iter().all(|(text, _)| text == "Hello"));
    }

    #[tokio::test]
    async fn any_failed_call_fails_the_write() {
        let materializer = Materializer::new(Arc::new(FailingTranslator));

        let err = materializer
            .materialize(LocalizedText::new("Hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Translation(_)));
    }

    #[tokio::test]
    async fn identity_translator_copies_source() {
        let materializer = Materializer::new(Arc::new(IdentityTranslator));
        let text = materializer
            .materialize(LocalizedText::new("Salom"))
            .await
            .unwrap();
        assert_eq!(text.en.as_deref(), Some("Salom"));
        assert_eq!(text.uz.as_deref(), Some("Salom"));
    }

    #[test]
    fn parses_gtx_segments() {
        let payload = json!([
            [["Hello, ", "Привет, ", null, null, 10], ["world", "мир", null, null, 10]],
            null,
            "ru"
        ]);
        assert_eq!(parse_gtx_response(&payload).unwrap(), "Hello, world");
    }

    #[test]
    fn rejects_malformed_gtx_payload() {
        assert!(parse_gtx_response(&json!({"error": "nope"})).is_err());
        assert!(parse_gtx_response(&json!([[]])).is_err());
    }
}
