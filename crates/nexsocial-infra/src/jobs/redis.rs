//! Redis job queue: a LIST of ready jobs plus a sorted set of delayed ones.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use nexsocial_core::ports::{Job, JobHandler, JobQueue, JobQueueError, QueueStats};

use super::{DEFAULT_RETRY_BACKOFF, JobStats, settle};
use crate::cache::RedisConfig;

#[derive(Debug, Clone)]
pub struct RedisJobQueueConfig {
    pub redis: RedisConfig,
    /// Key prefix for the queue's LIST and ZSET.
    pub queue_name: String,
    pub workers: usize,
    /// Blocking pop timeout in seconds.
    pub pop_timeout: u64,
    pub retry_backoff: Duration,
}

impl Default for RedisJobQueueConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            queue_name: "nexsocial:jobs".to_string(),
            workers: 4,
            pop_timeout: 5,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl RedisJobQueueConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let parse = |key: &str| std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok());
        Self {
            redis: RedisConfig::from_env(),
            queue_name: std::env::var("JOB_QUEUE_NAME").unwrap_or(defaults.queue_name),
            workers: parse("JOB_QUEUE_WORKERS")
                .map(|n| n as usize)
                .unwrap_or(defaults.workers),
            pop_timeout: parse("JOB_QUEUE_POP_TIMEOUT").unwrap_or(defaults.pop_timeout),
            retry_backoff: parse("JOB_QUEUE_RETRY_BACKOFF_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_backoff),
        }
    }
}

/// Redis-backed job queue.
pub struct RedisJobQueue {
    conn: ConnectionManager,
    config: RedisJobQueueConfig,
    stats: Arc<JobStats>,
    running: Arc<AtomicBool>,
}

#[derive(Clone)]
struct Keys {
    pending: String,
    delayed: String,
}

impl Keys {
    fn new(queue_name: &str) -> Self {
        Self {
            pending: format!("{queue_name}:pending"),
            delayed: format!("{queue_name}:delayed"),
        }
    }
}

/// Push a job onto the ready list, or park it in the delayed set.
async fn push(conn: &mut ConnectionManager, keys: &Keys, job: &Job) -> Result<(), JobQueueError> {
    let json = serde_json::to_string(job).map_err(|e| JobQueueError::EnqueueError(e.to_string()))?;
    let result = match job.scheduled_at {
        Some(at) if at > chrono::Utc::now() => {
            conn.zadd::<_, _, _, ()>(&keys.delayed, json, at.timestamp_millis())
                .await
        }
        _ => conn.rpush::<_, _, ()>(&keys.pending, json).await,
    };
    result.map_err(|e| JobQueueError::Backend(e.to_string()))
}

/// Move due jobs from the delayed set onto the ready list.
async fn promote_due(conn: &mut ConnectionManager, keys: &Keys) -> Result<usize, redis::RedisError> {
    let now = chrono::Utc::now().timestamp_millis();
    let due: Vec<String> = conn
        .zrangebyscore_limit(&keys.delayed, "-inf", now, 0, 100)
        .await?;

    let mut moved = 0;
    for json in due {
        // ZREM wins the race when several promoters see the same entry.
        let removed: i64 = conn.zrem(&keys.delayed, &json).await?;
        if removed == 1 {
            conn.rpush::<_, _, ()>(&keys.pending, &json).await?;
            moved += 1;
        }
    }
    Ok(moved)
}

impl RedisJobQueue {
    pub async fn new(config: RedisJobQueueConfig) -> Result<Self, JobQueueError> {
        let conn = config
            .redis
            .connect()
            .await
            .map_err(JobQueueError::Backend)?;

        tracing::info!(
            url = %config.redis.url,
            queue = %config.queue_name,
            workers = config.workers,
            "Connected to Redis job queue"
        );

        Ok(Self {
            conn,
            config,
            stats: Arc::new(JobStats::default()),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub async fn from_env() -> Result<Self, JobQueueError> {
        Self::new(RedisJobQueueConfig::from_env()).await
    }

    /// Ask workers to exit after their current pop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn keys(&self) -> Keys {
        Keys::new(&self.config.queue_name)
    }

    fn spawn_promoter(&self) {
        let mut conn = self.conn.clone();
        let keys = self.keys();
        let running = self.running.clone();

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            while running.load(Ordering::SeqCst) {
                tick.tick().await;
                match promote_due(&mut conn, &keys).await {
                    Ok(0) => {}
                    Ok(moved) => tracing::debug!(moved, "Promoted delayed jobs"),
                    Err(e) => tracing::warn!(error = %e, "Failed to promote delayed jobs"),
                }
            }
        });
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: Job) -> Result<(), JobQueueError> {
        let mut conn = self.conn.clone();
        push(&mut conn, &self.keys(), &job).await?;

        self.stats.queued();
        tracing::debug!(job_id = %job.id, job_type = %job.job_type, "Job enqueued");
        Ok(())
    }

    async fn start_worker(&self, handler: JobHandler) -> Result<(), JobQueueError> {
        self.running.store(true, Ordering::SeqCst);
        self.spawn_promoter();
        let handler = Arc::new(handler);

        for worker_id in 0..self.config.workers.max(1) {
            let mut conn = self.conn.clone();
            let keys = self.keys();
            let stats = self.stats.clone();
            let running = self.running.clone();
            let handler = handler.clone();
            let pop_timeout = self.config.pop_timeout as f64;
            let backoff = self.config.retry_backoff;

            tokio::spawn(async move {
                tracing::info!(worker_id, queue = %keys.pending, "Job queue worker started");

                while running.load(Ordering::SeqCst) {
                    let popped: Result<Option<(String, String)>, _> =
                        conn.blpop(&keys.pending, pop_timeout).await;

                    let json = match popped {
                        Ok(Some((_, json))) => json,
                        Ok(None) => continue,
                        Err(e) => {
                            tracing::error!(error = %e, "Redis BLPOP error");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                            continue;
                        }
                    };

                    let mut job: Job = match serde_json::from_str(&json) {
                        Ok(job) => job,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to deserialize job");
                            stats.dropped();
                            continue;
                        }
                    };

                    stats.started();
                    job.attempts += 1;
                    tracing::debug!(
                        worker_id,
                        job_id = %job.id,
                        job_type = %job.job_type,
                        attempt = job.attempts,
                        "Processing job"
                    );

                    let result = (*handler)(job.clone()).await;
                    if let Some(retry) = settle(job, result, &stats, backoff) {
                        match push(&mut conn, &keys, &retry).await {
                            Ok(()) => stats.queued(),
                            Err(e) => {
                                tracing::error!(job_id = %retry.id, error = %e, "Failed to re-enqueue job");
                                stats.dropped();
                            }
                        }
                    }
                }

                tracing::info!(worker_id, "Job queue worker stopped");
            });
        }

        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, JobQueueError> {
        Ok(self.stats.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use nexsocial_core::ports::{JobResult, handler_fn};

    async fn test_queue() -> Option<RedisJobQueue> {
        let config = RedisJobQueueConfig {
            redis: RedisConfig {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
                connect_timeout: Duration::from_secs(1),
                ..RedisConfig::default()
            },
            queue_name: format!("nexsocial-test-jobs-{}", uuid::Uuid::new_v4()),
            workers: 1,
            pop_timeout: 1,
            retry_backoff: Duration::ZERO,
        };
        RedisJobQueue::new(config).await.ok()
    }

    #[tokio::test]
    async fn test_redis_job_queue() {
        let Some(queue) = test_queue().await else {
            return;
        };

        let (tx, mut rx) = mpsc::channel(1);
        let payload = serde_json::json!({"key": "a.jpg"});

        queue
            .start_worker(handler_fn(move |job: Job| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(job.payload).await;
                    JobResult::Success
                }
            }))
            .await
            .unwrap();

        queue
            .enqueue(Job::new("media.cleanup", payload.clone()))
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, Some(payload));

        queue.stop();
    }
}
