use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded media object and who uploaded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaObject {
    pub key: String,
    pub uploader_id: Uuid,
    pub content_type: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl MediaObject {
    pub fn new(key: String, uploader_id: Uuid, content_type: String, size: u64) -> Self {
        Self {
            key,
            uploader_id,
            content_type,
            size,
            created_at: Utc::now(),
        }
    }

    pub fn is_uploaded_by(&self, user_id: Uuid) -> bool {
        self.uploader_id == user_id
    }
}
