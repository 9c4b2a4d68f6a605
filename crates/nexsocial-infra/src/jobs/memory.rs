//! In-process job queue on a bounded tokio channel. Jobs are lost on restart.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use nexsocial_core::ports::{Job, JobHandler, JobQueue, JobQueueError, QueueStats};

use super::{DEFAULT_RETRY_BACKOFF, JobStats, settle, time_until_due};

#[derive(Debug, Clone)]
pub struct InMemoryJobQueueConfig {
    /// Maximum queued jobs (0 = channel capacity only).
    pub max_size: usize,
    pub workers: usize,
    pub retry_backoff: Duration,
}

impl Default for InMemoryJobQueueConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            workers: 4,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl InMemoryJobQueueConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size: env_parse("JOB_QUEUE_MAX_SIZE").unwrap_or(defaults.max_size),
            workers: env_parse("JOB_QUEUE_WORKERS").unwrap_or(defaults.workers),
            retry_backoff: env_parse("JOB_QUEUE_RETRY_BACKOFF_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_backoff),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// In-memory job queue.
pub struct InMemoryJobQueue {
    config: InMemoryJobQueueConfig,
    stats: Arc<JobStats>,
    sender: mpsc::Sender<Job>,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl InMemoryJobQueue {
    pub fn new(config: InMemoryJobQueueConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.max_size.max(100));
        Self {
            config,
            stats: Arc::new(JobStats::default()),
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    pub fn from_env() -> Self {
        Self::new(InMemoryJobQueueConfig::from_env())
    }
}

/// Hand a job to the channel, waiting out its delay first.
fn deliver(sender: mpsc::Sender<Job>, job: Job) {
    tokio::spawn(async move {
        if let Some(wait) = time_until_due(&job) {
            tokio::time::sleep(wait).await;
        }
        let job_id = job.id.clone();
        if let Err(e) = sender.send(job).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to deliver delayed job");
        }
    });
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: Job) -> Result<(), JobQueueError> {
        if self.config.max_size > 0 && self.stats.pending() >= self.config.max_size {
            return Err(JobQueueError::QueueFull);
        }

        self.stats.queued();
        tracing::debug!(job_id = %job.id, job_type = %job.job_type, "Job enqueued");

        if time_until_due(&job).is_some() {
            deliver(self.sender.clone(), job);
            return Ok(());
        }
        self.sender.send(job).await.map_err(|e| {
            self.stats.dropped();
            JobQueueError::EnqueueError(e.to_string())
        })
    }

    async fn start_worker(&self, handler: JobHandler) -> Result<(), JobQueueError> {
        let handler = Arc::new(handler);

        for worker_id in 0..self.config.workers.max(1) {
            let handler = handler.clone();
            let receiver = self.receiver.clone();
            let stats = self.stats.clone();
            let sender = self.sender.clone();
            let backoff = self.config.retry_backoff;

            tokio::spawn(async move {
                tracing::info!(worker_id, "Job worker started");

                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(mut job) = next else {
                        tracing::info!(worker_id, "Job worker shutting down");
                        break;
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
                        stats.queued();
                        deliver(sender.clone(), retry);
                    }
                }
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
    use std::sync::atomic::{AtomicU32, Ordering};

    use nexsocial_core::ports::{JobResult, handler_fn};

    fn queue(workers: usize) -> InMemoryJobQueue {
        InMemoryJobQueue::new(InMemoryJobQueueConfig {
            max_size: 100,
            workers,
            retry_backoff: Duration::from_millis(10),
        })
    }

    #[tokio::test]
    async fn test_jobs_reach_the_handler() {
        let queue = queue(2);
        let (tx, mut rx) = mpsc::channel(4);

        queue
            .start_worker(handler_fn(move |job: Job| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(job.job_type).await;
                    JobResult::Success
                }
            }))
            .await
            .unwrap();

        queue
            .enqueue(Job::new("notification.follow", serde_json::json!({})))
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(received.as_deref(), Some("notification.follow"));
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let queue = queue(1);
        let calls = Arc::new(AtomicU32::new(0));
        let (tx, mut rx) = mpsc::channel(1);

        let counter = calls.clone();
        queue
            .start_worker(handler_fn(move |job: Job| {
                let counter = counter.clone();
                let tx = tx.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        return JobResult::Retry("transient".into());
                    }
                    let _ = tx.send(job.attempts).await;
                    JobResult::Success
                }
            }))
            .await
            .unwrap();

        queue
            .enqueue(Job::new("media.cleanup", serde_json::json!({"key": "a.jpg"})))
            .await
            .unwrap();

        let attempts = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(attempts, Some(2));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_queue_full() {
        let queue = InMemoryJobQueue::new(InMemoryJobQueueConfig {
            max_size: 1,
            workers: 1,
            retry_backoff: Duration::ZERO,
        });

        queue.enqueue(Job::new("a", serde_json::json!({}))).await.unwrap();
        let second = queue.enqueue(Job::new("b", serde_json::json!({}))).await;
        assert!(matches!(second, Err(JobQueueError::QueueFull)));
    }
}
