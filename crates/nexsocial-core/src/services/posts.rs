use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{
    Comment, NotificationKind, Page, PageRequest, Post, PostFilter, PostKind, PostStats, Profile,
};
use crate::error::DomainError;
use crate::ports::{
    EngagementRepository, JobQueue, MediaRepository, MediaStorage, PostRepository,
    ProfileRepository, storage,
};

use super::jobs::{self, MediaCleanupPayload};
use super::validation;

/// A post with its author and interaction counters.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    pub author_username: String,
    pub author_picture: String,
    pub media_url: String,
    pub stats: PostStats,
}

/// A comment with its author and, for top-level comments, the reply count.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub author_username: String,
    pub author_picture: String,
    pub reply_count: u64,
}

/// Default page size of the explore listing.
pub const EXPLORE_PAGE_SIZE: u64 = 3;

#[derive(Debug, Clone, Default)]
pub struct CreatePostInput {
    pub description: Option<String>,
    pub media_key: String,
    pub kind: PostKind,
}

/// Posts, likes, saves and comment threads.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    profiles: Arc<dyn ProfileRepository>,
    engagement: Arc<dyn EngagementRepository>,
    media: Arc<dyn MediaRepository>,
    storage: Arc<dyn MediaStorage>,
    jobs: Arc<dyn JobQueue>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        profiles: Arc<dyn ProfileRepository>,
        engagement: Arc<dyn EngagementRepository>,
        media: Arc<dyn MediaRepository>,
        storage: Arc<dyn MediaStorage>,
        jobs: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            posts,
            profiles,
            engagement,
            media,
            storage,
            jobs,
        }
    }

    /// Newest posts, optionally narrowed to a kind and an author username.
    pub async fn list(
        &self,
        kind: Option<PostKind>,
        author: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<PostView>, DomainError> {
        let author_id = match author.map(str::trim).filter(|a| !a.is_empty()) {
            Some(username) => match self.profiles.find_by_username(&username.to_lowercase()).await? {
                Some(profile) => Some(profile.user_id),
                None => return Ok(Page::empty(page)),
            },
            None => None,
        };

        let posts = self.posts.list(PostFilter { kind, author_id }, page).await?;
        self.hydrate(posts).await
    }

    /// The viewer's posts plus posts of everyone they follow.
    pub async fn feed(&self, viewer_id: Uuid, page: PageRequest) -> Result<Page<PostView>, DomainError> {
        let posts = self.posts.feed(viewer_id, page).await?;
        self.hydrate(posts).await
    }

    /// Every post, shuffled.
    pub async fn explore(&self, page: PageRequest) -> Result<Page<PostView>, DomainError> {
        let posts = self.posts.explore(page).await?;
        self.hydrate(posts).await
    }

    pub async fn get(&self, post_id: Uuid) -> Result<PostView, DomainError> {
        let post = self.require_post(post_id).await?;
        self.view(post).await
    }

    pub async fn create(&self, viewer_id: Uuid, input: CreatePostInput) -> Result<PostView, DomainError> {
        let description = validation::clean_description(input.description)?;
        let media_key = input.media_key.trim().to_string();
        let not_uploaded =
            || DomainError::Validation(format!("Media '{media_key}' has not been uploaded"));
        if !storage::is_valid_key(&media_key) {
            return Err(not_uploaded());
        }
        let Some(media) = self.media.find(&media_key).await? else {
            return Err(not_uploaded());
        };
        if !media.is_uploaded_by(viewer_id) {
            return Err(DomainError::Forbidden(
                "You can only post media you uploaded".to_string(),
            ));
        }
        if !self.storage.exists(&media_key).await? {
            return Err(not_uploaded());
        }
        if self.posts.media_in_use(&media_key).await? {
            return Err(DomainError::Duplicate(format!(
                "Media '{media_key}' is already attached to a post"
            )));
        }

        let post = self
            .posts
            .save(Post::new(viewer_id, description, media_key, input.kind))
            .await?;
        tracing::info!(post_id = %post.id, user_id = %viewer_id, kind = %post.kind, "Post created");

        self.view(post).await
    }

    /// Owner-only delete. Likes, comments and saves go with the post; the
    /// media object is removed in the background.
    pub async fn delete(&self, viewer_id: Uuid, post_id: Uuid) -> Result<(), DomainError> {
        let post = self.require_post(post_id).await?;
        if !post.is_owned_by(viewer_id) {
            return Err(DomainError::Forbidden(
                "You can only delete your own posts".to_string(),
            ));
        }

        self.posts.delete(post.id).await?;
        tracing::info!(post_id = %post.id, user_id = %viewer_id, "Post deleted");

        jobs::dispatch(
            &self.jobs,
            jobs::MEDIA_CLEANUP,
            &MediaCleanupPayload { key: post.media_key },
        )
        .await;
        Ok(())
    }

    /// Returns `false` if the viewer had already liked the post.
    pub async fn like(&self, viewer_id: Uuid, post_id: Uuid) -> Result<bool, DomainError> {
        let post = self.require_post(post_id).await?;
        let created = self.engagement.like(viewer_id, post.id).await?;
        if created {
            tracing::debug!(post_id = %post.id, user_id = %viewer_id, "Post liked");
            jobs::notify(
                &self.jobs,
                NotificationKind::Like,
                post.user_id,
                viewer_id,
                Some(post.id),
            )
            .await;
        }
        Ok(created)
    }

    pub async fn unlike(&self, viewer_id: Uuid, post_id: Uuid) -> Result<(), DomainError> {
        let post = self.require_post(post_id).await?;
        if !self.engagement.unlike(viewer_id, post.id).await? {
            return Err(DomainError::not_found("like", post.id));
        }
        Ok(())
    }

    /// Returns `false` if the viewer had already saved the post.
    pub async fn save(&self, viewer_id: Uuid, post_id: Uuid) -> Result<bool, DomainError> {
        let post = self.require_post(post_id).await?;
        Ok(self.engagement.save_post(viewer_id, post.id).await?)
    }

    pub async fn unsave(&self, viewer_id: Uuid, post_id: Uuid) -> Result<(), DomainError> {
        let post = self.require_post(post_id).await?;
        if !self.engagement.unsave_post(viewer_id, post.id).await? {
            return Err(DomainError::not_found("saved post", post.id));
        }
        Ok(())
    }

    pub async fn comment(
        &self,
        viewer_id: Uuid,
        post_id: Uuid,
        text: &str,
    ) -> Result<CommentView, DomainError> {
        let post = self.require_post(post_id).await?;
        let text = validation::clean_comment(text)?;

        let comment = self
            .engagement
            .add_comment(Comment::new(post.id, viewer_id, text))
            .await?;
        tracing::debug!(comment_id = %comment.id, post_id = %post.id, "Comment added");

        jobs::notify(
            &self.jobs,
            NotificationKind::Comment,
            post.user_id,
            viewer_id,
            Some(post.id),
        )
        .await;
        self.comment_view(comment).await
    }

    /// Reply to a comment. Replies to replies join the top-level thread.
    pub async fn reply(
        &self,
        viewer_id: Uuid,
        comment_id: Uuid,
        text: &str,
    ) -> Result<CommentView, DomainError> {
        let target = self.require_comment(comment_id).await?;
        let text = validation::clean_comment(text)?;

        let reply = self
            .engagement
            .add_comment(Comment::reply_to(&target, viewer_id, text))
            .await?;
        tracing::debug!(comment_id = %reply.id, thread = %target.thread_id(), "Reply added");

        jobs::notify(
            &self.jobs,
            NotificationKind::Reply,
            target.user_id,
            viewer_id,
            Some(target.post_id),
        )
        .await;
        self.comment_view(reply).await
    }

    /// Top-level comments, newest first, with reply counts.
    pub async fn list_comments(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentView>, DomainError> {
        let post = self.require_post(post_id).await?;
        let comments = self.engagement.list_comments(post.id, page).await?;

        let ids: Vec<Uuid> = comments.items.iter().map(|c| c.id).collect();
        let counts = self.engagement.reply_counts(&ids).await?;
        let authors = self.authors(comments.items.iter().map(|c| c.user_id)).await?;

        Ok(comments.map(|comment| {
            let reply_count = counts.get(&comment.id).copied().unwrap_or(0);
            build_comment_view(comment, &authors, reply_count)
        }))
    }

    /// Replies in the thread `comment_id` belongs to, oldest first.
    pub async fn list_replies(&self, comment_id: Uuid) -> Result<Vec<CommentView>, DomainError> {
        let comment = self.require_comment(comment_id).await?;
        let replies = self.engagement.list_replies(comment.thread_id()).await?;
        let authors = self.authors(replies.iter().map(|c| c.user_id)).await?;

        Ok(replies
            .into_iter()
            .map(|reply| build_comment_view(reply, &authors, 0))
            .collect())
    }

    async fn require_post(&self, post_id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))
    }

    async fn require_comment(&self, comment_id: Uuid) -> Result<Comment, DomainError> {
        self.engagement
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment", comment_id))
    }

    async fn view(&self, post: Post) -> Result<PostView, DomainError> {
        let request = PageRequest::new(Some(1), Some(1));
        let mut views = self.hydrate(Page::new(vec![post], 1, request)).await?;
        views
            .items
            .pop()
            .ok_or_else(|| DomainError::Internal("post view lost".to_string()))
    }

    async fn hydrate(&self, posts: Page<Post>) -> Result<Page<PostView>, DomainError> {
        let ids: Vec<Uuid> = posts.items.iter().map(|p| p.id).collect();
        let stats = if ids.is_empty() {
            HashMap::new()
        } else {
            self.posts.stats(&ids).await?
        };
        let authors = self.authors(posts.items.iter().map(|p| p.user_id)).await?;

        Ok(posts.map(|post| {
            let (author_username, author_picture) = author_fields(&authors, post.user_id);
            PostView {
                stats: stats.get(&post.id).copied().unwrap_or_default(),
                media_url: self.storage.public_url(&post.media_key),
                author_username,
                author_picture,
                post,
            }
        }))
    }

    async fn comment_view(&self, comment: Comment) -> Result<CommentView, DomainError> {
        let authors = self.authors(std::iter::once(comment.user_id)).await?;
        Ok(build_comment_view(comment, &authors, 0))
    }

    async fn authors(
        &self,
        user_ids: impl Iterator<Item = Uuid>,
    ) -> Result<HashMap<Uuid, Profile>, DomainError> {
        let unique: Vec<Uuid> = user_ids.collect::<HashSet<_>>().into_iter().collect();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .profiles
            .find_many(&unique)
            .await?
            .into_iter()
            .map(|p| (p.user_id, p))
            .collect())
    }
}

fn author_fields(authors: &HashMap<Uuid, Profile>, user_id: Uuid) -> (String, String) {
    match authors.get(&user_id) {
        Some(profile) => (profile.username.clone(), profile.picture.clone()),
        None => (String::new(), crate::domain::DEFAULT_PICTURE.to_string()),
    }
}

fn build_comment_view(
    comment: Comment,
    authors: &HashMap<Uuid, Profile>,
    reply_count: u64,
) -> CommentView {
    let (author_username, author_picture) = author_fields(authors, comment.user_id);
    CommentView {
        comment,
        author_username,
        author_picture,
        reply_count,
    }
}
