//! Persistence adapters: SeaORM/PostgreSQL and an in-memory store.

mod memory;

#[cfg(feature = "postgres")]
mod connections;
#[cfg(feature = "postgres")]
pub mod entity;
#[cfg(feature = "postgres")]
mod postgres_base;
#[cfg(feature = "postgres")]
pub mod postgres_repo;
#[cfg(feature = "postgres")]
pub mod postgres_social;

use std::sync::Arc;

use nexsocial_core::ports::{
    EngagementRepository, MediaRepository, NotificationRepository, PostRepository,
    ProfileRepository, SocialGraphRepository, UserRepository,
};

pub use memory::{
    InMemoryDatabase, InMemoryEngagementRepository, InMemoryMediaRepository,
    InMemoryNotificationRepository, InMemoryPostRepository, InMemoryProfileRepository,
    InMemorySocialGraphRepository, InMemoryUserRepository,
};

#[cfg(feature = "postgres")]
pub use connections::{DatabaseConfig, DatabaseConnections};
#[cfg(feature = "postgres")]
pub use postgres_base::PostgresBaseRepository;
#[cfg(feature = "postgres")]
pub use postgres_repo::{
    PostgresMediaRepository, PostgresPostRepository, PostgresProfileRepository,
    PostgresUserRepository,
};
#[cfg(feature = "postgres")]
pub use postgres_social::{
    PostgresEngagementRepository, PostgresNotificationRepository, PostgresSocialGraphRepository,
};

/// Every repository the services need, behind their ports.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub graph: Arc<dyn SocialGraphRepository>,
    pub engagement: Arc<dyn EngagementRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub media: Arc<dyn MediaRepository>,
}

impl Repositories {
    /// Fresh, empty in-memory store.
    pub fn in_memory() -> Self {
        let db = InMemoryDatabase::new();
        Self {
            users: Arc::new(db.users()),
            profiles: Arc::new(db.profiles()),
            posts: Arc::new(db.posts()),
            graph: Arc::new(db.graph()),
            engagement: Arc::new(db.engagement()),
            notifications: Arc::new(db.notifications()),
            media: Arc::new(db.media()),
        }
    }

    #[cfg(feature = "postgres")]
    pub fn postgres(db: sea_orm::DbConn) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            profiles: Arc::new(PostgresProfileRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            graph: Arc::new(PostgresSocialGraphRepository::new(db.clone())),
            engagement: Arc::new(PostgresEngagementRepository::new(db.clone())),
            notifications: Arc::new(PostgresNotificationRepository::new(db.clone())),
            media: Arc::new(PostgresMediaRepository::new(db)),
        }
    }
}

/// `alice@example.com` -> `a***@example.com`, for logs.
#[cfg_attr(not(feature = "postgres"), allow(dead_code))]
pub(crate) fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}
