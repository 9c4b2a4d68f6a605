//! Cache adapters. Redis when configured, a process-local map otherwise.

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::InMemoryCache;
#[cfg(feature = "redis")]
pub use redis::{RedisCache, RedisConfig};
