//! Media storage port - where uploaded images and videos live.

use async_trait::async_trait;

/// Metadata of a stored media object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub key: String,
    pub content_type: String,
    pub size: u64,
}

/// Media storage trait - abstraction over local disk, in-memory, or object stores.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store `bytes` under `key`.
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredMedia, StorageError>;

    /// Load an object and its metadata.
    async fn get(&self, key: &str) -> Result<Option<(StoredMedia, Vec<u8>)>, StorageError>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Remove an object. Removing a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public URL an object is served under.
    fn public_url(&self, key: &str) -> String;
}

/// Media storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Media not found: {0}")]
    NotFound(String),

    #[error("Invalid media key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O failed: {0}")]
    Io(String),
}

/// Allowed upload types and the file extension each is stored with.
pub const ALLOWED_MEDIA_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("video/mp4", "mp4"),
    ("video/quicktime", "mov"),
    ("video/x-msvideo", "avi"),
    ("video/webm", "webm"),
];

/// Extension for an allowed content type, `None` if the type is not accepted.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_MEDIA_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

/// Content type recorded for a stored key, derived from its extension.
pub fn content_type_for(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    ALLOWED_MEDIA_TYPES
        .iter()
        .find(|(_, e)| e.eq_ignore_ascii_case(ext))
        .map(|(mime, _)| *mime)
        .unwrap_or("application/octet-stream")
}

/// Keys are generated names: a flat file name of `[A-Za-z0-9_.-]`, no traversal.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && !key.starts_with('.')
        && !key.contains("..")
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_ignores_parameters() {
        assert_eq!(extension_for("image/PNG"), Some("png"));
        assert_eq!(extension_for("video/mp4; codecs=avc1"), Some("mp4"));
        assert_eq!(extension_for("application/pdf"), None);
    }

    #[test]
    fn test_content_type_for_key() {
        assert_eq!(content_type_for("abc.webm"), "video/webm");
        assert_eq!(content_type_for("abc"), "application/octet-stream");
    }

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("0f8e7c1a-1111-2222-3333-444455556666.jpg"));
        assert!(!is_valid_key("../etc/passwd"));
        assert!(!is_valid_key("dir/file.jpg"));
        assert!(!is_valid_key(".hidden"));
        assert!(!is_valid_key(""));
    }
}
