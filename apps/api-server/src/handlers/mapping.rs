//! Domain views to response DTOs.

use nexsocial_core::domain::{FollowPermission, Page, PageRequest, PostKind, Profile, ProfileUpdate, User};
use nexsocial_core::ports::IssuedToken;
use nexsocial_core::services::display::abbreviate;
use nexsocial_core::services::{CommentView, NotificationView, PostView, ProfileView};
use nexsocial_shared::Paginated;
use nexsocial_shared::dto::{
    AuthResponse, CommentResponse, NotificationResponse, PostResponse, ProfileResponse,
    ProfileSummary, UpdateProfileRequest, UserResponse,
};

use crate::middleware::error::AppError;

pub fn page_request(page: Option<u64>, page_size: Option<u64>) -> PageRequest {
    PageRequest::new(page, page_size)
}

/// Wrap a domain page in the pagination envelope, links relative to `path`.
pub fn paginated<T, U>(page: Page<T>, path: &str, f: impl FnMut(T) -> U) -> Paginated<U> {
    let request = page.request;
    let total = page.total;
    let results = page.items.into_iter().map(f).collect();
    Paginated::new(results, total, request.page, request.page_size).with_links(path)
}

pub fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        is_admin: user.is_admin,
        last_login_at: user.last_login_at,
        created_at: user.created_at,
    }
}

pub fn auth_response(user: &User, token: IssuedToken) -> AuthResponse {
    AuthResponse {
        access_token: token.access_token,
        token_type: "Bearer".to_string(),
        expires_in: token.expires_in,
        user: user_response(user),
    }
}

pub fn profile_response(view: ProfileView) -> ProfileResponse {
    let ProfileView {
        profile,
        stats,
        is_following,
        is_self,
    } = view;

    ProfileResponse {
        username: profile.username,
        name: profile.name,
        bio: profile.bio,
        picture: profile.picture,
        location: profile.location,
        website: profile.website,
        is_private: profile.is_private,
        who_can_follow: profile.who_can_follow.to_string(),
        followers_count: stats.followers,
        following_count: stats.following,
        posts_count: stats.posts,
        followers_display: abbreviate(stats.followers),
        following_display: abbreviate(stats.following),
        posts_display: abbreviate(stats.posts),
        is_following,
        is_self,
        created_at: profile.created_at,
    }
}

pub fn profile_summary(profile: Profile) -> ProfileSummary {
    ProfileSummary {
        username: profile.username,
        name: profile.name,
        picture: profile.picture,
        is_private: profile.is_private,
    }
}

pub fn profile_update(req: UpdateProfileRequest) -> Result<ProfileUpdate, AppError> {
    let who_can_follow = req
        .who_can_follow
        .map(|value| value.parse::<FollowPermission>())
        .transpose()
        .map_err(AppError::BadRequest)?;

    Ok(ProfileUpdate {
        name: req.name,
        bio: req.bio,
        picture: req.picture,
        location: req.location,
        website: req.website,
        is_private: req.is_private,
        who_can_follow,
    })
}

/// Parse an optional post kind; blank means "any".
pub fn post_kind(raw: Option<&str>) -> Result<Option<PostKind>, AppError> {
    raw.map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::parse::<PostKind>)
        .transpose()
        .map_err(AppError::BadRequest)
}

pub fn post_response(view: PostView) -> PostResponse {
    PostResponse {
        id: view.post.id,
        author: view.author_username,
        author_picture: view.author_picture,
        description: view.post.description,
        media_key: view.post.media_key,
        media_url: view.media_url,
        kind: view.post.kind.to_string(),
        like_count: view.stats.likes,
        comment_count: view.stats.comments,
        save_count: view.stats.saves,
        created_at: view.post.created_at,
    }
}

pub fn comment_response(view: CommentView) -> CommentResponse {
    CommentResponse {
        id: view.comment.id,
        post_id: view.comment.post_id,
        parent_id: view.comment.parent_id,
        author: view.author_username,
        author_picture: view.author_picture,
        text: view.comment.text,
        reply_count: view.reply_count,
        created_at: view.comment.created_at,
    }
}

pub fn notification_response(view: NotificationView) -> NotificationResponse {
    NotificationResponse {
        id: view.notification.id,
        kind: view.notification.kind.to_string(),
        actor: view.actor_username,
        post_id: view.notification.post_id,
        read: view.notification.read,
        created_at: view.notification.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_kind_parsing() {
        assert_eq!(post_kind(None).unwrap(), None);
        assert_eq!(post_kind(Some("  ")).unwrap(), None);
        assert_eq!(post_kind(Some("Reel")).unwrap(), Some(PostKind::Reel));
        assert!(post_kind(Some("story")).is_err());
    }

    #[test]
    fn test_profile_update_rejects_unknown_permission() {
        let req = UpdateProfileRequest {
            who_can_follow: Some("friends".to_string()),
            ..Default::default()
        };
        assert!(profile_update(req).is_err());

        let req = UpdateProfileRequest {
            who_can_follow: Some("none".to_string()),
            ..Default::default()
        };
        assert_eq!(
            profile_update(req).unwrap().who_can_follow,
            Some(FollowPermission::None)
        );
    }

    #[test]
    fn test_paginated_keeps_request_shape() {
        let page = PageRequest::new(Some(1), Some(2)).slice(&[1, 2, 3]);
        let envelope = paginated(page, "/api/posts/", |n| n * 10);

        assert_eq!(envelope.results, vec![10, 20]);
        assert_eq!(envelope.count, 3);
        assert_eq!(envelope.next.as_deref(), Some("/api/posts/?page=2&page_size=2"));
    }
}
