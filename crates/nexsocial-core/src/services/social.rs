use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{
    NotificationKind, Page, PageRequest, Profile, ProfileStats, ProfileUpdate,
};
use crate::error::DomainError;
use crate::ports::{JobQueue, PostRepository, ProfileRepository, SocialGraphRepository};

use super::{jobs, validation};

/// A profile as seen by a signed-in viewer.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub profile: Profile,
    pub stats: ProfileStats,
    pub is_following: bool,
    pub is_self: bool,
}

/// Profiles, follow edges and block edges.
#[derive(Clone)]
pub struct SocialService {
    profiles: Arc<dyn ProfileRepository>,
    graph: Arc<dyn SocialGraphRepository>,
    posts: Arc<dyn PostRepository>,
    jobs: Arc<dyn JobQueue>,
}

impl SocialService {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        graph: Arc<dyn SocialGraphRepository>,
        posts: Arc<dyn PostRepository>,
        jobs: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            profiles,
            graph,
            posts,
            jobs,
        }
    }

    pub async fn get_profile(&self, viewer_id: Uuid, username: &str) -> Result<ProfileView, DomainError> {
        let profile = self.require_profile(username).await?;
        let is_self = profile.user_id == viewer_id;

        if !is_self && self.blocked_either_way(viewer_id, profile.user_id).await? {
            return Err(DomainError::Forbidden(
                "You cannot view this profile".to_string(),
            ));
        }

        let stats = self.stats(profile.user_id).await?;
        let is_following = !is_self && self.graph.is_following(viewer_id, profile.user_id).await?;

        Ok(ProfileView {
            profile,
            stats,
            is_following,
            is_self,
        })
    }

    /// Edit the viewer's own profile.
    pub async fn update_profile(
        &self,
        viewer_id: Uuid,
        username: &str,
        update: ProfileUpdate,
    ) -> Result<ProfileView, DomainError> {
        let mut profile = self.require_profile(username).await?;
        if profile.user_id != viewer_id {
            return Err(DomainError::Forbidden(
                "You can only edit your own profile".to_string(),
            ));
        }
        validation::validate_profile_update(&update)?;

        profile.apply(update);
        let profile = self.profiles.save(profile).await?;
        let stats = self.stats(profile.user_id).await?;
        tracing::info!(user_id = %viewer_id, "Profile updated");

        Ok(ProfileView {
            profile,
            stats,
            is_following: false,
            is_self: true,
        })
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<ProfileStats, DomainError> {
        let (followers, following) = self.graph.follow_counts(user_id).await?;
        let posts = self.posts.count_by_user(user_id).await?;
        Ok(ProfileStats {
            followers,
            following,
            posts,
        })
    }

    pub async fn follow(&self, viewer_id: Uuid, username: &str) -> Result<Profile, DomainError> {
        let target = self.require_profile(username).await?;
        if target.user_id == viewer_id {
            return Err(DomainError::Validation("You cannot follow yourself".to_string()));
        }
        if self.blocked_either_way(viewer_id, target.user_id).await? {
            return Err(DomainError::Forbidden("You cannot follow this user".to_string()));
        }
        if !target.accepts_followers() {
            return Err(DomainError::Forbidden(
                "This account does not accept followers".to_string(),
            ));
        }

        if !self.graph.follow(viewer_id, target.user_id).await? {
            return Err(DomainError::Duplicate(format!(
                "You are already following {}",
                target.username
            )));
        }
        tracing::info!(follower = %viewer_id, followee = %target.user_id, "Follow created");

        jobs::notify(
            &self.jobs,
            NotificationKind::Follow,
            target.user_id,
            viewer_id,
            None,
        )
        .await;
        Ok(target)
    }

    pub async fn unfollow(&self, viewer_id: Uuid, username: &str) -> Result<(), DomainError> {
        let target = self.require_profile(username).await?;
        if target.user_id == viewer_id {
            return Err(DomainError::Validation("You cannot unfollow yourself".to_string()));
        }
        if !self.graph.unfollow(viewer_id, target.user_id).await? {
            return Err(DomainError::not_found("follow", &target.username));
        }
        tracing::info!(follower = %viewer_id, followee = %target.user_id, "Follow removed");
        Ok(())
    }

    /// Block a user. Existing follow edges between the two are dropped.
    pub async fn block(&self, viewer_id: Uuid, username: &str) -> Result<Profile, DomainError> {
        let target = self.require_profile(username).await?;
        if target.user_id == viewer_id {
            return Err(DomainError::Validation("You cannot block yourself".to_string()));
        }
        if !self.graph.block(viewer_id, target.user_id).await? {
            return Err(DomainError::Duplicate(format!(
                "You have already blocked {}",
                target.username
            )));
        }
        tracing::info!(blocker = %viewer_id, blocked = %target.user_id, "Block created");
        Ok(target)
    }

    pub async fn unblock(&self, viewer_id: Uuid, username: &str) -> Result<(), DomainError> {
        let target = self.require_profile(username).await?;
        if target.user_id == viewer_id {
            return Err(DomainError::Validation("You cannot unblock yourself".to_string()));
        }
        if !self.graph.unblock(viewer_id, target.user_id).await? {
            return Err(DomainError::not_found("block", &target.username));
        }
        tracing::info!(blocker = %viewer_id, blocked = %target.user_id, "Block removed");
        Ok(())
    }

    pub async fn blocked_users(&self, viewer_id: Uuid) -> Result<Vec<Profile>, DomainError> {
        let ids = self.graph.blocked_by(viewer_id).await?;
        self.profiles_in_order(&ids).await
    }

    pub async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Profile>, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Page::empty(page));
        }
        Ok(self.profiles.search(query, page).await?)
    }

    pub async fn followers(&self, username: &str, page: PageRequest) -> Result<Page<Profile>, DomainError> {
        let profile = self.require_profile(username).await?;
        let ids = self.graph.followers(profile.user_id, page).await?;
        self.hydrate(ids).await
    }

    pub async fn following(&self, username: &str, page: PageRequest) -> Result<Page<Profile>, DomainError> {
        let profile = self.require_profile(username).await?;
        let ids = self.graph.following(profile.user_id, page).await?;
        self.hydrate(ids).await
    }

    async fn require_profile(&self, username: &str) -> Result<Profile, DomainError> {
        let username = username.trim().to_lowercase();
        self.profiles
            .find_by_username(&username)
            .await?
            .ok_or_else(|| DomainError::not_found("user", username))
    }

    async fn blocked_either_way(&self, a: Uuid, b: Uuid) -> Result<bool, DomainError> {
        Ok(self.graph.is_blocked(a, b).await? || self.graph.is_blocked(b, a).await?)
    }

    async fn hydrate(&self, ids: Page<Uuid>) -> Result<Page<Profile>, DomainError> {
        let profiles = self.profiles_in_order(&ids.items).await?;
        Ok(Page::new(profiles, ids.total, ids.request))
    }

    /// Resolve ids to profiles, keeping the order of `ids`.
    async fn profiles_in_order(&self, ids: &[Uuid]) -> Result<Vec<Profile>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut by_id: HashMap<Uuid, Profile> = self
            .profiles
            .find_many(ids)
            .await?
            .into_iter()
            .map(|p| (p.user_id, p))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}
