//! Background job queues: Redis LIST when configured, tokio mpsc otherwise.
//!
//! Both backends share the retry policy in [`settle`]: a `Retry` outcome is
//! re-queued with a linear back-off until the job runs out of attempts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nexsocial_core::ports::{Job, JobResult, QueueStats};

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::{InMemoryJobQueue, InMemoryJobQueueConfig};
#[cfg(feature = "redis")]
pub use self::redis::{RedisJobQueue, RedisJobQueueConfig};

pub(crate) const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
pub(crate) struct JobStats {
    pending: AtomicUsize,
    processing: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl JobStats {
    pub(crate) fn queued(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn started(&self) {
        let _ = self
            .pending
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        self.processing.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    pub(crate) fn dropped(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueueStats {
        QueueStats {
            pending: self.pending.load(Ordering::Relaxed),
            processing: self.processing.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Record the outcome of one attempt. Returns the job to re-queue, if any.
pub(crate) fn settle(
    job: Job,
    result: JobResult,
    stats: &JobStats,
    backoff: Duration,
) -> Option<Job> {
    stats.processing.fetch_sub(1, Ordering::Relaxed);
    match result {
        JobResult::Success => {
            stats.completed.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(job_id = %job.id, job_type = %job.job_type, "Job completed");
            None
        }
        JobResult::Retry(reason) if job.attempts < job.max_attempts => {
            let delay = backoff * job.attempts;
            tracing::warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempt = job.attempts,
                max_attempts = job.max_attempts,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "Job failed, will retry"
            );
            let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
            Some(job.delayed(delay))
        }
        JobResult::Retry(reason) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempts = job.attempts,
                reason = %reason,
                "Job failed after max retries"
            );
            None
        }
        JobResult::Failed(reason) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                job_id = %job.id,
                job_type = %job.job_type,
                reason = %reason,
                "Job failed permanently"
            );
            None
        }
    }
}

/// Time left until a delayed job is due.
pub(crate) fn time_until_due(job: &Job) -> Option<Duration> {
    let at = job.scheduled_at?;
    (at - chrono::Utc::now()).to_std().ok().filter(|d| !d.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(job: &mut Job, stats: &JobStats) {
        stats.queued();
        stats.started();
        job.attempts += 1;
    }

    #[test]
    fn test_retry_until_attempts_exhausted() {
        let stats = JobStats::default();
        let mut job = Job::new("notification.like", serde_json::json!({})).with_max_attempts(2);

        attempt(&mut job, &stats);
        let mut retried = settle(job, JobResult::Retry("db down".into()), &stats, Duration::ZERO)
            .expect("first failure is retried");

        attempt(&mut retried, &stats);
        assert!(settle(retried, JobResult::Retry("db down".into()), &stats, Duration::ZERO).is_none());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.processing, 0);
    }

    #[test]
    fn test_retry_is_delayed_linearly() {
        let stats = JobStats::default();
        let mut job = Job::new("media.cleanup", serde_json::json!({}));
        attempt(&mut job, &stats);

        let retried = settle(
            job,
            JobResult::Retry("io".into()),
            &stats,
            Duration::from_secs(60),
        )
        .unwrap();
        let wait = time_until_due(&retried).unwrap();
        assert!(wait > Duration::from_secs(50) && wait <= Duration::from_secs(60));
    }

    #[test]
    fn test_permanent_failure_is_not_retried() {
        let stats = JobStats::default();
        let mut job = Job::new("notification.follow", serde_json::json!("bad"));
        attempt(&mut job, &stats);

        assert!(settle(job, JobResult::Failed("malformed".into()), &stats, Duration::ZERO).is_none());
        assert_eq!(stats.snapshot().failed, 1);
    }
}
