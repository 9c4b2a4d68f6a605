//! Media kept in process memory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use nexsocial_core::ports::storage::is_valid_key;
use nexsocial_core::ports::{MediaStorage, StorageError, StoredMedia};

pub struct InMemoryMediaStorage {
    objects: RwLock<HashMap<String, (StoredMedia, Vec<u8>)>>,
    url_prefix: String,
}

impl InMemoryMediaStorage {
    pub fn new(url_prefix: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            url_prefix: url_prefix.into(),
        }
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for InMemoryMediaStorage {
    fn default() -> Self {
        Self::new("/media")
    }
}

#[async_trait]
impl MediaStorage for InMemoryMediaStorage {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredMedia, StorageError> {
        if !is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let meta = StoredMedia {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
        };
        self.objects
            .write()
            .await
            .insert(key.to_string(), (meta.clone(), bytes));
        Ok(meta)
    }

    async fn get(&self, key: &str) -> Result<Option<(StoredMedia, Vec<u8>)>, StorageError> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.url_prefix)
    }
}
