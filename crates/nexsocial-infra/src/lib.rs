//! # NexSocial Infrastructure
//!
//! Concrete implementations of the ports defined in `nexsocial-core`:
//! persistence, credentials, cache, rate limiting, job queues and media storage.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory only
//! - `postgres` - PostgreSQL persistence via SeaORM
//! - `auth` - JWT + Argon2 authentication
//! - `rate-limit` - Rate limiting via governor
//! - `redis` - Redis support for cache, rate limiting and the job queue

pub mod cache;
pub mod database;
pub mod jobs;
pub mod storage;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

// Re-exports - In-Memory
pub use cache::InMemoryCache;
pub use database::{InMemoryDatabase, Repositories};
pub use jobs::{InMemoryJobQueue, InMemoryJobQueueConfig};
pub use storage::{InMemoryMediaStorage, LocalMediaStorage, MediaConfig};

#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, DatabaseConnections};

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{InMemoryRateLimiter, RateLimitConfig};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
#[cfg(feature = "redis")]
pub use jobs::{RedisJobQueue, RedisJobQueueConfig};
#[cfg(all(feature = "redis", feature = "rate-limit"))]
pub use rate_limit::{RedisRateLimitConfig, RedisRateLimiter};
