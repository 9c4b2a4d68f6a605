use std::sync::Arc;

use uuid::Uuid;

use crate::domain::MediaObject;
use crate::error::DomainError;
use crate::ports::{MediaRepository, MediaStorage, StoredMedia, storage};

/// Upload, serve and delete user media.
#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn MediaStorage>,
    media: Arc<dyn MediaRepository>,
    max_bytes: u64,
}

impl MediaService {
    pub fn new(
        storage: Arc<dyn MediaStorage>,
        media: Arc<dyn MediaRepository>,
        max_bytes: u64,
    ) -> Self {
        Self {
            storage,
            media,
            max_bytes,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Store an upload under a freshly generated `<uuid>.<ext>` key and
    /// record the uploader, who alone may attach it to a post.
    pub async fn upload(
        &self,
        uploader_id: Uuid,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<(StoredMedia, String), DomainError> {
        let content_type = content_type.unwrap_or_default();
        let Some(ext) = storage::extension_for(content_type) else {
            return Err(DomainError::UnsupportedMedia(if content_type.is_empty() {
                "missing Content-Type".to_string()
            } else {
                content_type.to_string()
            }));
        };
        if bytes.is_empty() {
            return Err(DomainError::Validation("Uploaded file is empty".to_string()));
        }
        if bytes.len() as u64 > self.max_bytes {
            return Err(DomainError::PayloadTooLarge {
                limit: self.max_bytes,
            });
        }

        let key = format!("{}.{ext}", Uuid::new_v4());
        let mime = storage::content_type_for(&key);
        let stored = self.storage.put(&key, mime, bytes).await?;
        let record = MediaObject::new(
            stored.key.clone(),
            uploader_id,
            stored.content_type.clone(),
            stored.size,
        );
        if let Err(err) = self.media.record(record).await {
            self.storage.delete(&stored.key).await.ok();
            return Err(err.into());
        }
        tracing::info!(
            key = %stored.key,
            size = stored.size,
            content_type = %stored.content_type,
            uploader = %uploader_id,
            "Media uploaded"
        );

        let url = self.storage.public_url(&stored.key);
        Ok((stored, url))
    }

    pub async fn fetch(&self, key: &str) -> Result<(StoredMedia, Vec<u8>), DomainError> {
        if !storage::is_valid_key(key) {
            return Err(DomainError::not_found("media", key));
        }
        self.storage
            .get(key)
            .await?
            .ok_or_else(|| DomainError::not_found("media", key))
    }

    pub async fn delete(&self, key: &str) -> Result<(), DomainError> {
        if !storage::is_valid_key(key) {
            return Err(DomainError::Validation(format!("Invalid media key: {key}")));
        }
        self.storage.delete(key).await?;
        self.media.remove(key).await?;
        tracing::debug!(key, "Media deleted");
        Ok(())
    }
}
