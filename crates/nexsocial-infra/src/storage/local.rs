//! Media on the local file system, one flat directory.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use nexsocial_core::ports::storage::{content_type_for, is_valid_key};
use nexsocial_core::ports::{MediaStorage, StorageError, StoredMedia};

pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub root: PathBuf,
    /// Prefix of public URLs, e.g. `/media`.
    pub url_prefix: String,
    pub max_bytes: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./media"),
            url_prefix: "/media".to_string(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl MediaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            root: std::env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.root),
            url_prefix: std::env::var("MEDIA_URL_PREFIX")
                .map(|p| p.trim_end_matches('/').to_string())
                .unwrap_or(defaults.url_prefix),
            max_bytes: std::env::var("MEDIA_MAX_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u64| *n > 0)
                .unwrap_or(defaults.max_bytes),
        }
    }
}

pub struct LocalMediaStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalMediaStorage {
    /// Create the storage directory if needed.
    pub async fn new(config: &MediaConfig) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&config.root)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {e}", config.root.display())))?;
        tracing::info!(root = %config.root.display(), "Using local media storage");
        Ok(Self {
            root: config.root.clone(),
            url_prefix: config.url_prefix.clone(),
        })
    }

    fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredMedia, StorageError> {
        let path = self.path(key)?;
        let size = bytes.len() as u64;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(StoredMedia {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<(StoredMedia, Vec<u8>)>, StorageError> {
        let path = self.path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some((
                StoredMedia {
                    key: key.to_string(),
                    content_type: content_type_for(key).to_string(),
                    size: bytes.len() as u64,
                },
                bytes,
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.url_prefix)
    }
}
