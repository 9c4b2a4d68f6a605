use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user's like on one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A post bookmarked by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPost {
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Comment on a post. Replies carry the id of their top-level comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: Uuid, user_id: Uuid, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            parent_id: None,
            text,
            created_at: Utc::now(),
        }
    }

    /// Reply to `target`. Replies to replies attach to the top-level thread.
    pub fn reply_to(target: &Comment, user_id: Uuid, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id: target.post_id,
            user_id,
            parent_id: Some(target.thread_id()),
            text,
            created_at: Utc::now(),
        }
    }

    /// Id of the top-level comment this belongs to.
    pub fn thread_id(&self) -> Uuid {
        self.parent_id.unwrap_or(self.id)
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_to_reply_flattens_to_thread() {
        let post_id = Uuid::new_v4();
        let root = Comment::new(post_id, Uuid::new_v4(), "root".into());
        let reply = Comment::reply_to(&root, Uuid::new_v4(), "first".into());
        let nested = Comment::reply_to(&reply, Uuid::new_v4(), "second".into());

        assert_eq!(reply.parent_id, Some(root.id));
        assert_eq!(nested.parent_id, Some(root.id));
        assert_eq!(nested.post_id, post_id);
        assert!(!root.is_reply());
    }
}
