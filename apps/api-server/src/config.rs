//! Application configuration loaded from environment variables.

use std::env;

use nexsocial_infra::{InMemoryJobQueueConfig, JwtConfig, MediaConfig};

#[cfg(feature = "postgres")]
use nexsocial_infra::DatabaseConfig;
#[cfg(feature = "rate-limit")]
use nexsocial_infra::RateLimitConfig;

#[cfg(feature = "scheduler")]
use crate::background::scheduler::SchedulerConfig;
use crate::telemetry::TelemetryConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs on the in-memory store.
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    /// `None` keeps cache, job queue and rate limiter in process.
    pub redis_url: Option<String>,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
    pub jobs: InMemoryJobQueueConfig,
    #[cfg(feature = "rate-limit")]
    pub login_rate_limit: RateLimitConfig,
    #[cfg(feature = "scheduler")]
    pub scheduler: SchedulerConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            #[cfg(feature = "postgres")]
            database: DatabaseConfig::from_env(),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            jwt: JwtConfig::from_env(),
            media: MediaConfig::from_env(),
            jobs: InMemoryJobQueueConfig::from_env(),
            #[cfg(feature = "rate-limit")]
            login_rate_limit: RateLimitConfig::from_env(),
            #[cfg(feature = "scheduler")]
            scheduler: SchedulerConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        }
    }
}
