use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::User;

/// Picture shown until a user uploads their own.
pub const DEFAULT_PICTURE: &str = "/media/avatar/user.jpg";

/// Who may create a follow edge towards a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowPermission {
    #[default]
    All,
    None,
}

impl FollowPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowPermission::All => "all",
            FollowPermission::None => "none",
        }
    }
}

impl fmt::Display for FollowPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FollowPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(FollowPermission::All),
            "none" => Ok(FollowPermission::None),
            other => Err(format!("unknown follow permission '{other}'")),
        }
    }
}

/// Public profile attached 1:1 to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
    pub bio: Option<String>,
    pub picture: String,
    pub location: Option<String>,
    pub website: Option<String>,
    pub is_private: bool,
    pub who_can_follow: FollowPermission,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// The profile created alongside a fresh account.
    pub fn for_user(user: &User) -> Self {
        let now = Utc::now();
        Self {
            user_id: user.id,
            username: user.username.clone(),
            name: user.username.clone(),
            bio: None,
            picture: DEFAULT_PICTURE.to_string(),
            location: None,
            website: None,
            is_private: false,
            who_can_follow: FollowPermission::All,
            created_at: now,
            updated_at: now,
        }
    }

    /// Private accounts that disallow followers reject every follow request.
    pub fn accepts_followers(&self) -> bool {
        !(self.is_private && self.who_can_follow == FollowPermission::None)
    }

    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(bio) = update.bio {
            self.bio = non_empty(bio);
        }
        if let Some(picture) = update.picture {
            self.picture = non_empty(picture).unwrap_or_else(|| DEFAULT_PICTURE.to_string());
        }
        if let Some(location) = update.location {
            self.location = non_empty(location);
        }
        if let Some(website) = update.website {
            self.website = non_empty(website);
        }
        if let Some(is_private) = update.is_private {
            self.is_private = is_private;
        }
        if let Some(who_can_follow) = update.who_can_follow {
            self.who_can_follow = who_can_follow;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial profile edit. An empty string clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub picture: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub is_private: Option<bool>,
    pub who_can_follow: Option<FollowPermission>,
}

/// Edge-derived counters shown on a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub followers: u64,
    pub following: u64,
    pub posts: u64,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
