//! In-memory store implementing every repository port.
//!
//! All tables sit behind one `RwLock`, so rules touching several tables
//! (block dropping follows, post delete cascading) apply atomically.
//! Rows are kept in insertion order, which is also creation order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use uuid::Uuid;

use nexsocial_core::domain::{
    Block, Comment, Follow, Like, MediaObject, Notification, Page, PageRequest, Post, PostFilter,
    PostStats, Profile, SavedPost, User,
};
use nexsocial_core::error::RepoError;
use nexsocial_core::ports::{
    BaseRepository, EngagementRepository, MediaRepository, NotificationRepository,
    PostRepository, ProfileRepository, SocialGraphRepository, UserRepository,
};

#[derive(Default)]
struct State {
    users: Vec<User>,
    profiles: Vec<Profile>,
    posts: Vec<Post>,
    follows: Vec<Follow>,
    blocks: Vec<Block>,
    likes: Vec<Like>,
    saves: Vec<SavedPost>,
    comments: Vec<Comment>,
    notifications: Vec<Notification>,
    media: Vec<MediaObject>,
}

impl State {
    fn check_user_unique(&self, user: &User) -> Result<(), RepoError> {
        let taken = self.users.iter().any(|u| {
            u.id != user.id && (u.username == user.username || u.email == user.email)
        });
        if taken {
            return Err(RepoError::Unique(
                "users_username_or_email_key".to_string(),
            ));
        }
        Ok(())
    }

    fn check_profile_unique(&self, profile: &Profile) -> Result<(), RepoError> {
        if self
            .profiles
            .iter()
            .any(|p| p.user_id != profile.user_id && p.username == profile.username)
        {
            return Err(RepoError::Unique("profiles_username_key".to_string()));
        }
        Ok(())
    }

    fn remove_post(&mut self, post_id: Uuid) -> bool {
        let before = self.posts.len();
        self.posts.retain(|p| p.id != post_id);
        if self.posts.len() == before {
            return false;
        }
        self.likes.retain(|l| l.post_id != post_id);
        self.saves.retain(|s| s.post_id != post_id);
        self.comments.retain(|c| c.post_id != post_id);
        true
    }

    fn remove_user(&mut self, user_id: Uuid) -> bool {
        let before = self.users.len();
        self.users.retain(|u| u.id != user_id);
        if self.users.len() == before {
            return false;
        }
        let owned: Vec<Uuid> = self
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.id)
            .collect();
        for post_id in owned {
            self.remove_post(post_id);
        }
        self.profiles.retain(|p| p.user_id != user_id);
        self.follows
            .retain(|f| f.follower_id != user_id && f.followee_id != user_id);
        self.blocks
            .retain(|b| b.blocker_id != user_id && b.blocked_id != user_id);
        self.likes.retain(|l| l.user_id != user_id);
        self.saves.retain(|s| s.user_id != user_id);
        self.comments.retain(|c| c.user_id != user_id);
        self.notifications
            .retain(|n| n.recipient_id != user_id && n.actor_id != user_id);
        self.media.retain(|m| m.uploader_id != user_id);
        true
    }
}

/// Replace the row matching `same` or append `row`.
fn upsert<T: Clone>(rows: &mut Vec<T>, row: T, same: impl Fn(&T) -> bool) -> T {
    match rows.iter_mut().find(|r| same(r)) {
        Some(existing) => *existing = row.clone(),
        None => rows.push(row.clone()),
    }
    row
}

/// Newest-first page over rows stored oldest first.
fn newest_first<'a, T: Clone + 'a>(
    rows: impl DoubleEndedIterator<Item = &'a T>,
    page: PageRequest,
) -> Page<T> {
    let ordered: Vec<T> = rows.rev().cloned().collect();
    page.slice(&ordered)
}

/// Handle to a shared in-memory database; cheap to clone.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<RwLock<State>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            state: self.state.clone(),
        }
    }

    pub fn profiles(&self) -> InMemoryProfileRepository {
        InMemoryProfileRepository {
            state: self.state.clone(),
        }
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository {
            state: self.state.clone(),
        }
    }

    pub fn graph(&self) -> InMemorySocialGraphRepository {
        InMemorySocialGraphRepository {
            state: self.state.clone(),
        }
    }

    pub fn engagement(&self) -> InMemoryEngagementRepository {
        InMemoryEngagementRepository {
            state: self.state.clone(),
        }
    }

    pub fn notifications(&self) -> InMemoryNotificationRepository {
        InMemoryNotificationRepository {
            state: self.state.clone(),
        }
    }

    pub fn media(&self) -> InMemoryMediaRepository {
        InMemoryMediaRepository {
            state: self.state.clone(),
        }
    }
}

pub struct InMemoryUserRepository {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut state = self.state.write().await;
        state.check_user_unique(&user)?;
        let id = user.id;
        Ok(upsert(&mut state.users, user, |u| u.id == id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        if self.state.write().await.remove_user(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_with_profile(
        &self,
        user: User,
        profile: Profile,
    ) -> Result<(User, Profile), RepoError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.id == user.id) {
            return Err(RepoError::Unique("users_pkey".to_string()));
        }
        state.check_user_unique(&user)?;
        if profile.user_id != user.id {
            return Err(RepoError::ForeignKey("profiles_user_id_fkey".to_string()));
        }
        state.check_profile_unique(&profile)?;
        state.users.push(user.clone());
        state.profiles.push(profile.clone());
        Ok((user, profile))
    }
}

pub struct InMemoryProfileRepository {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl BaseRepository<Profile, Uuid> for InMemoryProfileRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Profile>, RepoError> {
        let state = self.state.read().await;
        Ok(state.profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn save(&self, profile: Profile) -> Result<Profile, RepoError> {
        let mut state = self.state.write().await;
        if !state.users.iter().any(|u| u.id == profile.user_id) {
            return Err(RepoError::ForeignKey("profiles_user_id_fkey".to_string()));
        }
        state.check_profile_unique(&profile)?;
        let user_id = profile.user_id;
        Ok(upsert(&mut state.profiles, profile, |p| p.user_id == user_id))
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let before = state.profiles.len();
        state.profiles.retain(|p| p.user_id != user_id);
        if state.profiles.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, RepoError> {
        let state = self.state.read().await;
        Ok(state.profiles.iter().find(|p| p.username == username).cloned())
    }

    async fn find_many(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .profiles
            .iter()
            .filter(|p| user_ids.contains(&p.user_id))
            .cloned()
            .collect())
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Profile>, RepoError> {
        let needle = query.to_lowercase();
        let state = self.state.read().await;
        let mut matches: Vec<Profile> = state
            .profiles
            .iter()
            .filter(|p| p.username.contains(&needle) || p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(page.slice(&matches))
    }
}

pub struct InMemoryPostRepository {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let state = self.state.read().await;
        Ok(state.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        let mut state = self.state.write().await;
        if !state.users.iter().any(|u| u.id == post.user_id) {
            return Err(RepoError::ForeignKey("posts_user_id_fkey".to_string()));
        }
        if state
            .posts
            .iter()
            .any(|p| p.id != post.id && p.media_key == post.media_key)
        {
            return Err(RepoError::Unique("idx_posts_media_key".to_string()));
        }
        let id = post.id;
        Ok(upsert(&mut state.posts, post, |p| p.id == id))
    }

    /// Likes, saves and comments go with the post.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        if self.state.write().await.remove_post(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn list(&self, filter: PostFilter, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let state = self.state.read().await;
        let rows = state.posts.iter().filter(|p| {
            filter.kind.is_none_or(|k| p.kind == k)
                && filter.author_id.is_none_or(|a| p.user_id == a)
        });
        let rows: Vec<&Post> = rows.collect();
        Ok(newest_first(rows.into_iter(), page))
    }

    async fn feed(&self, viewer_id: Uuid, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let state = self.state.read().await;
        let followed: Vec<Uuid> = state
            .follows
            .iter()
            .filter(|f| f.follower_id == viewer_id)
            .map(|f| f.followee_id)
            .collect();
        let rows: Vec<&Post> = state
            .posts
            .iter()
            .filter(|p| p.user_id == viewer_id || followed.contains(&p.user_id))
            .collect();
        Ok(newest_first(rows.into_iter(), page))
    }

    async fn explore(&self, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let mut rows = self.state.read().await.posts.clone();
        rows.shuffle(&mut rand::thread_rng());
        Ok(page.slice(&rows))
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state.posts.iter().filter(|p| p.user_id == user_id).count() as u64)
    }

    async fn media_in_use(&self, media_key: &str) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state.posts.iter().any(|p| p.media_key == media_key))
    }

    async fn stats(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, PostStats>, RepoError> {
        let state = self.state.read().await;
        Ok(post_ids
            .iter()
            .map(|id| {
                let stats = PostStats {
                    likes: state.likes.iter().filter(|l| l.post_id == *id).count() as u64,
                    comments: state.comments.iter().filter(|c| c.post_id == *id).count() as u64,
                    saves: state.saves.iter().filter(|s| s.post_id == *id).count() as u64,
                };
                (*id, stats)
            })
            .collect())
    }
}

pub struct InMemorySocialGraphRepository {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl SocialGraphRepository for InMemorySocialGraphRepository {
    async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        if follower_id == followee_id {
            return Err(RepoError::Check("follows_no_self_follow".to_string()));
        }
        let mut state = self.state.write().await;
        if state
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followee_id == followee_id)
        {
            return Ok(false);
        }
        state.follows.push(Follow::new(follower_id, followee_id));
        Ok(true)
    }

    async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.followee_id == followee_id));
        Ok(state.follows.len() < before)
    }

    async fn is_following(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followee_id == followee_id))
    }

    async fn followers(&self, user_id: Uuid, page: PageRequest) -> Result<Page<Uuid>, RepoError> {
        let state = self.state.read().await;
        let ids: Vec<Uuid> = state
            .follows
            .iter()
            .filter(|f| f.followee_id == user_id)
            .map(|f| f.follower_id)
            .collect();
        Ok(newest_first(ids.iter(), page))
    }

    async fn following(&self, user_id: Uuid, page: PageRequest) -> Result<Page<Uuid>, RepoError> {
        let state = self.state.read().await;
        let ids: Vec<Uuid> = state
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .map(|f| f.followee_id)
            .collect();
        Ok(newest_first(ids.iter(), page))
    }

    async fn follow_counts(&self, user_id: Uuid) -> Result<(u64, u64), RepoError> {
        let state = self.state.read().await;
        let followers = state.follows.iter().filter(|f| f.followee_id == user_id).count();
        let following = state.follows.iter().filter(|f| f.follower_id == user_id).count();
        Ok((followers as u64, following as u64))
    }

    async fn block(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, RepoError> {
        if blocker_id == blocked_id {
            return Err(RepoError::Check("blocks_no_self_block".to_string()));
        }
        let mut state = self.state.write().await;
        let existed = state
            .blocks
            .iter()
            .any(|b| b.blocker_id == blocker_id && b.blocked_id == blocked_id);
        if !existed {
            state.blocks.push(Block::new(blocker_id, blocked_id));
        }
        state.follows.retain(|f| {
            !((f.follower_id == blocker_id && f.followee_id == blocked_id)
                || (f.follower_id == blocked_id && f.followee_id == blocker_id))
        });
        Ok(!existed)
    }

    async fn unblock(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.blocks.len();
        state
            .blocks
            .retain(|b| !(b.blocker_id == blocker_id && b.blocked_id == blocked_id));
        Ok(state.blocks.len() < before)
    }

    async fn is_blocked(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .blocks
            .iter()
            .any(|b| b.blocker_id == blocker_id && b.blocked_id == blocked_id))
    }

    async fn blocked_by(&self, blocker_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .blocks
            .iter()
            .rev()
            .filter(|b| b.blocker_id == blocker_id)
            .map(|b| b.blocked_id)
            .collect())
    }
}

pub struct InMemoryEngagementRepository {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl EngagementRepository for InMemoryEngagementRepository {
    async fn like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.iter().any(|p| p.id == post_id) {
            return Err(RepoError::ForeignKey("likes_post_id_fkey".to_string()));
        }
        if state
            .likes
            .iter()
            .any(|l| l.user_id == user_id && l.post_id == post_id)
        {
            return Ok(false);
        }
        state.likes.push(Like {
            user_id,
            post_id,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.likes.len();
        state
            .likes
            .retain(|l| !(l.user_id == user_id && l.post_id == post_id));
        Ok(state.likes.len() < before)
    }

    async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .likes
            .iter()
            .any(|l| l.user_id == user_id && l.post_id == post_id))
    }

    async fn save_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.iter().any(|p| p.id == post_id) {
            return Err(RepoError::ForeignKey("saved_posts_post_id_fkey".to_string()));
        }
        if state
            .saves
            .iter()
            .any(|s| s.user_id == user_id && s.post_id == post_id)
        {
            return Ok(false);
        }
        state.saves.push(SavedPost {
            user_id,
            post_id,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn unsave_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.saves.len();
        state
            .saves
            .retain(|s| !(s.user_id == user_id && s.post_id == post_id));
        Ok(state.saves.len() < before)
    }

    async fn add_comment(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(RepoError::ForeignKey("comments_post_id_fkey".to_string()));
        }
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let state = self.state.read().await;
        Ok(state.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Comment>, RepoError> {
        let state = self.state.read().await;
        let rows: Vec<&Comment> = state
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && c.parent_id.is_none())
            .collect();
        Ok(newest_first(rows.into_iter(), page))
    }

    async fn list_replies(&self, comment_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.parent_id == Some(comment_id))
            .cloned()
            .collect())
    }

    async fn reply_counts(&self, comment_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, RepoError> {
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for parent in state.comments.iter().filter_map(|c| c.parent_id) {
            if comment_ids.contains(&parent) {
                *counts.entry(parent).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

pub struct InMemoryNotificationRepository {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn save(&self, notification: Notification) -> Result<Notification, RepoError> {
        let mut state = self.state.write().await;
        let id = notification.id;
        Ok(upsert(&mut state.notifications, notification, |n| n.id == id))
    }

    async fn list_for(
        &self,
        recipient_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Notification>, RepoError> {
        let state = self.state.read().await;
        let rows: Vec<&Notification> = state
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .collect();
        Ok(newest_first(rows.into_iter(), page))
    }

    async fn unread_count(&self, recipient_id: Uuid) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
            .count() as u64)
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        let mut marked = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
        {
            n.read = true;
            marked += 1;
        }
        Ok(marked)
    }

    async fn prune_read_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        let before = state.notifications.len();
        state
            .notifications
            .retain(|n| !(n.read && n.created_at < cutoff));
        Ok((before - state.notifications.len()) as u64)
    }
}

pub struct InMemoryMediaRepository {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl MediaRepository for InMemoryMediaRepository {
    async fn record(&self, media: MediaObject) -> Result<MediaObject, RepoError> {
        let mut state = self.state.write().await;
        if !state.users.iter().any(|u| u.id == media.uploader_id) {
            return Err(RepoError::ForeignKey(
                "fk_media_objects_uploader".to_string(),
            ));
        }
        if state.media.iter().any(|m| m.key == media.key) {
            return Err(RepoError::Unique("media_objects_pkey".to_string()));
        }
        state.media.push(media.clone());
        Ok(media)
    }

    async fn find(&self, key: &str) -> Result<Option<MediaObject>, RepoError> {
        let state = self.state.read().await;
        Ok(state.media.iter().find(|m| m.key == key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.media.len();
        state.media.retain(|m| m.key != key);
        Ok(state.media.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexsocial_core::domain::{NotificationKind, PostKind};

    async fn seed_user(db: &InMemoryDatabase, username: &str) -> User {
        let user = User::new(
            username.to_string(),
            format!("{username}@example.com"),
            "hash".to_string(),
        );
        let user = db.users().save(user).await.unwrap();
        db.profiles().save(Profile::for_user(&user)).await.unwrap();
        user
    }

    async fn seed_post(db: &InMemoryDatabase, author: &User) -> Post {
        db.posts()
            .save(Post::new(
                author.id,
                None,
                format!("{}.jpg", Uuid::new_v4()),
                PostKind::Post,
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_username_and_email_unique() {
        let db = InMemoryDatabase::new();
        seed_user(&db, "alice").await;

        let clash = User::new("alice".into(), "other@example.com".into(), "h".into());
        assert!(matches!(
            db.users().save(clash).await,
            Err(RepoError::Unique(_))
        ));
    }

    #[tokio::test]
    async fn test_create_with_profile_is_all_or_nothing() {
        let db = InMemoryDatabase::new();
        let alice = seed_user(&db, "alice").await;

        let user = User::new("bob".into(), "bob@example.com".into(), "h".into());
        let mut profile = Profile::for_user(&user);
        profile.username = alice.username.clone();
        assert!(matches!(
            db.users().create_with_profile(user.clone(), profile).await,
            Err(RepoError::Unique(_))
        ));
        assert!(db.users().find_by_id(user.id).await.unwrap().is_none());

        let profile = Profile::for_user(&user);
        let (stored, profile) = db.users().create_with_profile(user, profile).await.unwrap();
        assert_eq!(profile.user_id, stored.id);
        assert!(db.profiles().find_by_id(stored.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_media_key_backs_one_post() {
        let db = InMemoryDatabase::new();
        let alice = seed_user(&db, "alice").await;
        let first = seed_post(&db, &alice).await;

        assert!(db.posts().media_in_use(&first.media_key).await.unwrap());
        let reuse = Post::new(alice.id, None, first.media_key.clone(), PostKind::Reel);
        assert!(matches!(
            db.posts().save(reuse).await,
            Err(RepoError::Unique(_))
        ));

        // updating the post itself keeps its key
        db.posts().save(first.clone()).await.unwrap();

        db.posts().delete(first.id).await.unwrap();
        assert!(!db.posts().media_in_use(&first.media_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_media_records() {
        let db = InMemoryDatabase::new();
        let alice = seed_user(&db, "alice").await;
        let media = db.media();

        let record = MediaObject::new("a.png".into(), alice.id, "image/png".into(), 3);
        media.record(record.clone()).await.unwrap();
        assert!(matches!(
            media.record(record).await,
            Err(RepoError::Unique(_))
        ));

        let orphan = MediaObject::new("b.png".into(), Uuid::new_v4(), "image/png".into(), 3);
        assert!(matches!(
            media.record(orphan).await,
            Err(RepoError::ForeignKey(_))
        ));

        let found = media.find("a.png").await.unwrap().unwrap();
        assert!(found.is_uploaded_by(alice.id));
        assert!(media.remove("a.png").await.unwrap());
        assert!(!media.remove("a.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_explore_pages_through_every_post() {
        let db = InMemoryDatabase::new();
        let alice = seed_user(&db, "alice").await;
        for _ in 0..5 {
            seed_post(&db, &alice).await;
        }

        let first = db.posts().explore(PageRequest::new(Some(1), Some(3))).await.unwrap();
        assert_eq!(first.items.len(), 3);
        assert_eq!(first.total, 5);
        assert_eq!(first.next_page(), Some(2));

        let past_end = db
            .posts()
            .explore(PageRequest::new(Some(u64::MAX), Some(3)))
            .await
            .unwrap();
        assert!(past_end.items.is_empty());
    }

    #[tokio::test]
    async fn test_follow_is_idempotent_and_counted() {
        let db = InMemoryDatabase::new();
        let alice = seed_user(&db, "alice").await;
        let bob = seed_user(&db, "bob").await;
        let graph = db.graph();

        assert!(graph.follow(alice.id, bob.id).await.unwrap());
        assert!(!graph.follow(alice.id, bob.id).await.unwrap());
        assert_eq!(graph.follow_counts(bob.id).await.unwrap(), (1, 0));
        assert_eq!(graph.follow_counts(alice.id).await.unwrap(), (0, 1));

        assert!(matches!(
            graph.follow(bob.id, bob.id).await,
            Err(RepoError::Check(_))
        ));
    }

    #[tokio::test]
    async fn test_block_drops_follows_both_ways() {
        let db = InMemoryDatabase::new();
        let alice = seed_user(&db, "alice").await;
        let bob = seed_user(&db, "bob").await;
        let graph = db.graph();

        graph.follow(alice.id, bob.id).await.unwrap();
        graph.follow(bob.id, alice.id).await.unwrap();

        assert!(graph.block(alice.id, bob.id).await.unwrap());
        assert!(!graph.is_following(alice.id, bob.id).await.unwrap());
        assert!(!graph.is_following(bob.id, alice.id).await.unwrap());
        assert!(!graph.block(alice.id, bob.id).await.unwrap());
        assert_eq!(graph.blocked_by(alice.id).await.unwrap(), vec![bob.id]);
    }

    #[tokio::test]
    async fn test_feed_has_own_and_followed_posts_newest_first() {
        let db = InMemoryDatabase::new();
        let alice = seed_user(&db, "alice").await;
        let bob = seed_user(&db, "bob").await;
        let carol = seed_user(&db, "carol").await;
        db.graph().follow(alice.id, bob.id).await.unwrap();

        let own = seed_post(&db, &alice).await;
        let followed = seed_post(&db, &bob).await;
        seed_post(&db, &carol).await;

        let feed = db.posts().feed(alice.id, PageRequest::default()).await.unwrap();
        let ids: Vec<Uuid> = feed.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![followed.id, own.id]);
        assert_eq!(feed.total, 2);
    }

    #[tokio::test]
    async fn test_delete_post_cascades() {
        let db = InMemoryDatabase::new();
        let alice = seed_user(&db, "alice").await;
        let post = seed_post(&db, &alice).await;
        let engagement = db.engagement();

        engagement.like(alice.id, post.id).await.unwrap();
        engagement.save_post(alice.id, post.id).await.unwrap();
        engagement
            .add_comment(Comment::new(post.id, alice.id, "hi".into()))
            .await
            .unwrap();

        db.posts().delete(post.id).await.unwrap();

        let stats = db.posts().stats(&[post.id]).await.unwrap();
        assert_eq!(stats[&post.id], PostStats::default());
        assert!(matches!(
            db.posts().delete(post.id).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_comment_threads() {
        let db = InMemoryDatabase::new();
        let alice = seed_user(&db, "alice").await;
        let post = seed_post(&db, &alice).await;
        let engagement = db.engagement();

        let root = engagement
            .add_comment(Comment::new(post.id, alice.id, "root".into()))
            .await
            .unwrap();
        let reply = Comment::reply_to(&root, alice.id, "reply".into());
        engagement.add_comment(reply.clone()).await.unwrap();
        engagement
            .add_comment(Comment::reply_to(&reply, alice.id, "nested".into()))
            .await
            .unwrap();

        let top = engagement
            .list_comments(post.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(top.total, 1);

        let replies = engagement.list_replies(root.id).await.unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].text, "reply");

        let counts = engagement.reply_counts(&[root.id]).await.unwrap();
        assert_eq!(counts[&root.id], 2);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let db = InMemoryDatabase::new();
        let alice = seed_user(&db, "alice").await;
        seed_user(&db, "bob").await;

        let mut profile = db.profiles().find_by_id(alice.id).await.unwrap().unwrap();
        profile.name = "Wonderland Alice".into();
        db.profiles().save(profile).await.unwrap();

        let hits = db
            .profiles()
            .search("WONDER", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(hits.items.len(), 1);
        assert_eq!(hits.items[0].username, "alice");
    }

    #[tokio::test]
    async fn test_notifications_read_and_prune() {
        let db = InMemoryDatabase::new();
        let alice = seed_user(&db, "alice").await;
        let bob = seed_user(&db, "bob").await;
        let repo = db.notifications();

        repo.save(Notification::new(alice.id, bob.id, NotificationKind::Follow, None))
            .await
            .unwrap();
        assert_eq!(repo.unread_count(alice.id).await.unwrap(), 1);

        assert_eq!(repo.mark_all_read(alice.id).await.unwrap(), 1);
        assert_eq!(repo.unread_count(alice.id).await.unwrap(), 0);

        let pruned = repo
            .prune_read_before(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(pruned, 1);
    }
}
