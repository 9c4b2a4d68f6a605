//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod job_queue;
mod rate_limit;
mod repository;
pub mod storage;

pub use auth::{AuthError, IssuedToken, PasswordService, TokenClaims, TokenService};
pub use cache::{Cache, CacheError};
pub use job_queue::{
    Job, JobHandler, JobQueue, JobQueueError, JobResult, QueueStats, handler_fn,
};
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
pub use repository::{
    BaseRepository, EngagementRepository, MediaRepository, NotificationRepository,
    PostRepository, ProfileRepository, SocialGraphRepository, UserRepository,
};
pub use storage::{MediaStorage, StorageError, StoredMedia};
