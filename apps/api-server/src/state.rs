//! Application state - shared across all handlers.

use std::sync::Arc;

use nexsocial_core::ports::{Cache, JobQueue, MediaStorage, PasswordService, TokenService};
use nexsocial_core::services::{
    AccountService, MediaService, NotificationService, PostService, SocialService,
};
use nexsocial_infra::{
    Argon2PasswordService, InMemoryCache, InMemoryJobQueue, InMemoryJobQueueConfig,
    InMemoryMediaStorage, JwtConfig, JwtTokenService, LocalMediaStorage, Repositories,
};

#[cfg(feature = "rate-limit")]
use nexsocial_core::ports::RateLimiter;
#[cfg(feature = "rate-limit")]
use nexsocial_infra::{InMemoryRateLimiter, RateLimitConfig};
#[cfg(feature = "postgres")]
use nexsocial_infra::DatabaseConnections;
#[cfg(feature = "redis")]
use nexsocial_infra::{RedisCache, RedisConfig, RedisJobQueue, RedisJobQueueConfig};
#[cfg(all(feature = "redis", feature = "rate-limit"))]
use nexsocial_infra::{RedisRateLimitConfig, RedisRateLimiter};

use crate::config::AppConfig;

/// Which adapters the running state ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backends {
    pub database: &'static str,
    pub cache: &'static str,
    pub jobs: &'static str,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub social: SocialService,
    pub posts: PostService,
    pub media: MediaService,
    pub notifications: NotificationService,
    pub jobs: Arc<dyn JobQueue>,
    #[cfg(feature = "rate-limit")]
    pub login_limiter: Arc<dyn RateLimiter>,
    #[cfg(feature = "postgres")]
    pub db: Option<Arc<DatabaseConnections>>,
    pub backends: Backends,
}

/// Adapters the services are wired over.
struct Adapters {
    repos: Repositories,
    cache: Arc<dyn Cache>,
    jobs: Arc<dyn JobQueue>,
    storage: Arc<dyn MediaStorage>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
    max_upload_bytes: u64,
}

impl AppState {
    /// Build the application state, falling back to in-process adapters for
    /// anything that is not configured or cannot be reached.
    pub async fn new(config: &AppConfig) -> std::io::Result<Self> {
        #[cfg(feature = "postgres")]
        let (db, repos, database) = match &config.database {
            Some(db_config) => match DatabaseConnections::init(db_config).await {
                Ok(connections) => {
                    let repos = Repositories::postgres(connections.main.clone());
                    (Some(Arc::new(connections)), repos, "postgres")
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Failed to connect to database. Using in-memory fallback."
                    );
                    (None, Repositories::in_memory(), "memory")
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                (None, Repositories::in_memory(), "memory")
            }
        };
        #[cfg(not(feature = "postgres"))]
        let (repos, database) = {
            tracing::info!("Running without postgres feature - using in-memory repositories");
            (Repositories::in_memory(), "memory")
        };

        let (cache, cache_backend) = build_cache(config).await;
        let (jobs, jobs_backend) = build_job_queue(config).await;
        #[cfg(feature = "rate-limit")]
        let login_limiter = build_login_limiter(config).await;

        let storage = LocalMediaStorage::new(&config.media)
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        tracing::info!(root = %config.media.root.display(), "Media storage ready");

        let adapters = Adapters {
            repos,
            cache,
            jobs,
            storage: Arc::new(storage),
            passwords: Arc::new(Argon2PasswordService::new()),
            tokens: Arc::new(JwtTokenService::new(config.jwt.clone())),
            max_upload_bytes: config.media.max_bytes,
        };
        let backends = Backends {
            database,
            cache: cache_backend,
            jobs: jobs_backend,
        };

        tracing::info!(
            database = backends.database,
            cache = backends.cache,
            jobs = backends.jobs,
            "Application state initialized"
        );

        Ok(Self::wire(
            adapters,
            backends,
            #[cfg(feature = "rate-limit")]
            login_limiter,
            #[cfg(feature = "postgres")]
            db,
        ))
    }

    /// Fully in-process state with cheap password hashing. Workers are not
    /// started.
    pub fn in_memory() -> Self {
        let passwords: Arc<dyn PasswordService> = match Argon2PasswordService::with_params(1024, 1, 1)
        {
            Ok(fast) => Arc::new(fast),
            Err(_) => Arc::new(Argon2PasswordService::new()),
        };
        let adapters = Adapters {
            repos: Repositories::in_memory(),
            cache: Arc::new(InMemoryCache::new()),
            jobs: Arc::new(InMemoryJobQueue::new(InMemoryJobQueueConfig::default())),
            storage: Arc::new(InMemoryMediaStorage::default()),
            passwords,
            tokens: Arc::new(JwtTokenService::new(JwtConfig::default())),
            max_upload_bytes: nexsocial_infra::MediaConfig::default().max_bytes,
        };
        let backends = Backends {
            database: "memory",
            cache: "memory",
            jobs: "memory",
        };

        Self::wire(
            adapters,
            backends,
            #[cfg(feature = "rate-limit")]
            Arc::new(InMemoryRateLimiter::new(RateLimitConfig::default())),
            #[cfg(feature = "postgres")]
            None,
        )
    }

    /// Replace the upload limit, e.g. to exercise size checks with small bodies.
    pub fn with_max_upload_bytes(mut self, max_bytes: u64) -> Self {
        self.media = self.media.clone().with_max_bytes(max_bytes);
        self
    }

    /// Replace the login limiter.
    #[cfg(feature = "rate-limit")]
    pub fn with_login_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.login_limiter = limiter;
        self
    }

    fn wire(
        adapters: Adapters,
        backends: Backends,
        #[cfg(feature = "rate-limit")] login_limiter: Arc<dyn RateLimiter>,
        #[cfg(feature = "postgres")] db: Option<Arc<DatabaseConnections>>,
    ) -> Self {
        let Adapters {
            repos,
            cache,
            jobs,
            storage,
            passwords,
            tokens,
            max_upload_bytes,
        } = adapters;

        Self {
            accounts: AccountService::new(repos.users.clone(), passwords, tokens, cache),
            social: SocialService::new(
                repos.profiles.clone(),
                repos.graph.clone(),
                repos.posts.clone(),
                jobs.clone(),
            ),
            posts: PostService::new(
                repos.posts.clone(),
                repos.profiles.clone(),
                repos.engagement.clone(),
                repos.media.clone(),
                storage.clone(),
                jobs.clone(),
            ),
            media: MediaService::new(storage, repos.media.clone(), max_upload_bytes),
            notifications: NotificationService::new(
                repos.notifications.clone(),
                repos.profiles.clone(),
            ),
            jobs,
            #[cfg(feature = "rate-limit")]
            login_limiter,
            #[cfg(feature = "postgres")]
            db,
            backends,
        }
    }
}

#[cfg(feature = "redis")]
fn redis_config(url: &str) -> RedisConfig {
    RedisConfig {
        url: url.to_string(),
        ..RedisConfig::from_env()
    }
}

async fn build_cache(config: &AppConfig) -> (Arc<dyn Cache>, &'static str) {
    #[cfg(feature = "redis")]
    if let Some(url) = &config.redis_url {
        match RedisCache::new(redis_config(url)).await {
            Ok(cache) => return (Arc::new(cache), "redis"),
            Err(e) => tracing::error!(error = %e, "Redis cache unavailable, using in-memory cache"),
        }
    }
    #[cfg(not(feature = "redis"))]
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL set but the redis feature is disabled");
    }
    (Arc::new(InMemoryCache::new()), "memory")
}

async fn build_job_queue(config: &AppConfig) -> (Arc<dyn JobQueue>, &'static str) {
    #[cfg(feature = "redis")]
    if let Some(url) = &config.redis_url {
        let redis_jobs = RedisJobQueueConfig {
            redis: redis_config(url),
            ..RedisJobQueueConfig::from_env()
        };
        match RedisJobQueue::new(redis_jobs).await {
            Ok(queue) => return (Arc::new(queue), "redis"),
            Err(e) => tracing::error!(error = %e, "Redis job queue unavailable, using in-memory queue"),
        }
    }
    (Arc::new(InMemoryJobQueue::new(config.jobs.clone())), "memory")
}

#[cfg(feature = "rate-limit")]
async fn build_login_limiter(config: &AppConfig) -> Arc<dyn RateLimiter> {
    #[cfg(feature = "redis")]
    if let Some(url) = &config.redis_url {
        let limiter_config = RedisRateLimitConfig {
            redis: redis_config(url),
            limit: config.login_rate_limit.clone(),
            ..RedisRateLimitConfig::from_env()
        };
        match RedisRateLimiter::new(limiter_config).await {
            Ok(limiter) => return Arc::new(limiter),
            Err(e) => tracing::error!(error = %e, "Redis rate limiter unavailable, using in-memory limiter"),
        }
    }
    Arc::new(InMemoryRateLimiter::new(config.login_rate_limit.clone()))
}
