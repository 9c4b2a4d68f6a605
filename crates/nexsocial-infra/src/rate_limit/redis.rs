//! Fixed-window counter in Redis, shared across instances.

use std::time::Duration;

use async_trait::async_trait;
use redis::Script;
use redis::aio::ConnectionManager;

use nexsocial_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

use super::RateLimitConfig;
use crate::cache::RedisConfig;

const INCR_WITH_EXPIRY: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return {current, redis.call('TTL', KEYS[1])}
"#;

#[derive(Debug, Clone)]
pub struct RedisRateLimitConfig {
    pub redis: RedisConfig,
    pub limit: RateLimitConfig,
    pub key_prefix: String,
}

impl Default for RedisRateLimitConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            limit: RateLimitConfig::default(),
            key_prefix: "nexsocial:ratelimit".to_string(),
        }
    }
}

impl RedisRateLimitConfig {
    pub fn from_env() -> Self {
        Self {
            redis: RedisConfig::from_env(),
            limit: RateLimitConfig::from_env(),
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| Self::default().key_prefix),
        }
    }
}

pub struct RedisRateLimiter {
    conn: ConnectionManager,
    config: RedisRateLimitConfig,
    script: Script,
}

impl RedisRateLimiter {
    pub async fn new(config: RedisRateLimitConfig) -> Result<Self, RateLimitError> {
        let conn = config
            .redis
            .connect()
            .await
            .map_err(RateLimitError::Backend)?;
        tracing::info!(url = %config.redis.url, "Connected to Redis rate limiter");

        Ok(Self {
            conn,
            config,
            script: Script::new(INCR_WITH_EXPIRY),
        })
    }

    pub async fn from_env() -> Result<Self, RateLimitError> {
        Self::new(RedisRateLimitConfig::from_env()).await
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let mut conn = self.conn.clone();
        let limit = &self.config.limit;

        let (count, ttl): (i64, i64) = self
            .script
            .key(format!("{}:{key}", self.config.key_prefix))
            .arg(limit.window.as_secs().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;

        let count = count.max(0) as u64;
        let allowed = count <= u64::from(limit.max_requests);
        Ok(RateLimitResult {
            allowed,
            remaining: u64::from(limit.max_requests).saturating_sub(count) as u32,
            reset_after: Duration::from_secs(ttl.max(1) as u64),
        })
    }
}
