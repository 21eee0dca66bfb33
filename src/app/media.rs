use bytes::Bytes;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::app::error::ServiceError;
use crate::domain::content::MediaKind;
use crate::infra::storage::ObjectStorage;

const SRC_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct MediaService {
    storage: ObjectStorage,
}

#[derive(Debug, Serialize)]
pub struct StoredMedia {
    pub key: String,
    pub media_kind: MediaKind,
    pub content_type: String,
    pub bytes: usize,
}

impl MediaService {
    pub fn new(storage: ObjectStorage) -> Self {
        Self { storage }
    }

    /// Validates that the bytes match the declared kind, then stores them.
    pub async fn upload(
        &self,
        profile_id: i64,
        media_kind: MediaKind,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredMedia, ServiceError> {
        let ext = validate_upload(media_kind, content_type, &data)?;
        let key = format!("src/{}/{}.{}", profile_id, Uuid::new_v4(), ext);
        let bytes = data.len();

        self.storage
            .put(&key, content_type, data)
            .await
            .map_err(ServiceError::Storage)?;

        tracing::info!(profile_id, key = %key, bytes, "stored media");
        Ok(StoredMedia {
            key,
            media_kind,
            content_type: content_type.to_string(),
            bytes,
        })
    }

    /// Best-effort presigned link for a stored source file.
    pub async fn src_url(&self, key: &str) -> Option<String> {
        match self.storage.presigned_get(key, SRC_URL_TTL).await {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(error = ?err, key = %key, "failed to presign source url");
                None
            }
        }
    }
}

/// Returns the file extension to store the upload under.
fn validate_upload(
    media_kind: MediaKind,
    content_type: &str,
    data: &[u8],
) -> Result<&'static str, ServiceError> {
    if data.is_empty() {
        return Err(ServiceError::validation("file is empty"));
    }

    match media_kind {
        MediaKind::Photo => {
            let ext = image_extension(content_type)
                .ok_or_else(|| ServiceError::validation("file must be an image"))?;
            image::load_from_memory(data)
                .map_err(|_| ServiceError::validation("file could not be opened as an image"))?;
            Ok(ext)
        }
        MediaKind::Video => {
            if !content_type.starts_with("video/") {
                return Err(ServiceError::validation("file must be a video"));
            }
            sniff_video(data).ok_or_else(|| ServiceError::validation("file must be a video"))
        }
    }
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn sniff_video(data: &[u8]) -> Option<&'static str> {
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return match &data[8..12] {
            b"qt  " => Some("mov"),
            _ => Some("mp4"),
        };
    }
    if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some("webm");
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"AVI " {
        return Some("avi");
    }
    None
}
