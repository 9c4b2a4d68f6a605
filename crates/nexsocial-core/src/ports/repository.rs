use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Comment, MediaObject, Notification, Page, PageRequest, Post, PostFilter, PostStats, Profile,
    User,
};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their (lowercased) username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Insert a new user and its profile together; neither is stored if
    /// either insert fails.
    async fn create_with_profile(
        &self,
        user: User,
        profile: Profile,
    ) -> Result<(User, Profile), RepoError>;
}

/// Profile repository. Profiles are keyed by their user's id.
#[async_trait]
pub trait ProfileRepository: BaseRepository<Profile, Uuid> {
    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, RepoError>;

    /// Profiles for a set of users, in no particular order.
    async fn find_many(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, RepoError>;

    /// Case-insensitive substring search over username and display name.
    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Profile>, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Newest-first listing.
    async fn list(&self, filter: PostFilter, page: PageRequest) -> Result<Page<Post>, RepoError>;

    /// Posts by the viewer and everyone they follow, newest first.
    async fn feed(&self, viewer_id: Uuid, page: PageRequest) -> Result<Page<Post>, RepoError>;

    /// Every post in random order.
    async fn explore(&self, page: PageRequest) -> Result<Page<Post>, RepoError>;

    async fn count_by_user(&self, user_id: Uuid) -> Result<u64, RepoError>;

    /// Whether some post already uses this media object.
    async fn media_in_use(&self, media_key: &str) -> Result<bool, RepoError>;

    /// Interaction counters for each requested post. Missing posts map to zeroes.
    async fn stats(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, PostStats>, RepoError>;
}

/// Upload records, keyed by storage key.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn record(&self, media: MediaObject) -> Result<MediaObject, RepoError>;

    async fn find(&self, key: &str) -> Result<Option<MediaObject>, RepoError>;

    /// Returns `false` if there was no record.
    async fn remove(&self, key: &str) -> Result<bool, RepoError>;
}

/// Follow and block edges.
#[async_trait]
pub trait SocialGraphRepository: Send + Sync {
    /// Insert a follow edge. Returns `false` if it already existed.
    async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError>;

    /// Remove a follow edge. Returns `false` if there was none.
    async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError>;

    async fn is_following(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError>;

    /// Ids of users following `user_id`, newest edge first.
    async fn followers(&self, user_id: Uuid, page: PageRequest) -> Result<Page<Uuid>, RepoError>;

    /// Ids of users `user_id` follows, newest edge first.
    async fn following(&self, user_id: Uuid, page: PageRequest) -> Result<Page<Uuid>, RepoError>;

    /// `(followers, following)` for a user.
    async fn follow_counts(&self, user_id: Uuid) -> Result<(u64, u64), RepoError>;

    /// Insert a block edge and drop follow edges in both directions atomically.
    /// Returns `false` if the block already existed.
    async fn block(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, RepoError>;

    async fn unblock(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, RepoError>;

    async fn is_blocked(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, RepoError>;

    /// Ids blocked by `blocker_id`, newest first.
    async fn blocked_by(&self, blocker_id: Uuid) -> Result<Vec<Uuid>, RepoError>;
}

/// Likes, saves and comments on posts.
#[async_trait]
pub trait EngagementRepository: Send + Sync {
    /// Returns `false` if the like already existed.
    async fn like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError>;

    async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError>;

    async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError>;

    /// Returns `false` if the post was already saved.
    async fn save_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError>;

    async fn unsave_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError>;

    async fn add_comment(&self, comment: Comment) -> Result<Comment, RepoError>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, RepoError>;

    /// Top-level comments on a post, newest first.
    async fn list_comments(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Comment>, RepoError>;

    /// Replies in a thread, oldest first.
    async fn list_replies(&self, comment_id: Uuid) -> Result<Vec<Comment>, RepoError>;

    async fn reply_counts(&self, comment_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, RepoError>;
}

/// Notification inbox.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn save(&self, notification: Notification) -> Result<Notification, RepoError>;

    /// Newest first.
    async fn list_for(
        &self,
        recipient_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Notification>, RepoError>;

    async fn unread_count(&self, recipient_id: Uuid) -> Result<u64, RepoError>;

    /// Returns the number of notifications marked.
    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64, RepoError>;

    /// Delete read notifications created before `cutoff`.
    async fn prune_read_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError>;
}
