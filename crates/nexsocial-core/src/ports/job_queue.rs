//! Job queue port - abstraction over job queue backends.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// A job that can be queued and processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: String,
    /// Job type/name for routing to handlers.
    pub job_type: String,
    /// Serialized payload.
    pub payload: serde_json::Value,
    /// Number of retry attempts.
    pub attempts: u32,
    /// Maximum retry attempts.
    pub max_attempts: u32,
    /// When the job was created.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// When to execute the job (for delayed jobs).
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Job {
    pub fn new(job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_type: job_type.into(),
            payload,
            attempts: 0,
            max_attempts: 3,
            created_at: chrono::Utc::now(),
            scheduled_at: None,
        }
    }

    /// Build a job from any serializable payload.
    pub fn with_payload<T: Serialize>(
        job_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, JobQueueError> {
        let value = serde_json::to_value(payload)
            .map_err(|e| JobQueueError::EnqueueError(e.to_string()))?;
        Ok(Self::new(job_type, value))
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn delayed(mut self, delay: chrono::Duration) -> Self {
        self.scheduled_at = Some(chrono::Utc::now() + delay);
        self
    }

    /// Decode the payload into a typed value.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Whether a delayed job is due.
    pub fn is_due(&self) -> bool {
        self.scheduled_at
            .map(|at| at <= chrono::Utc::now())
            .unwrap_or(true)
    }
}

/// Result of job processing.
#[derive(Debug)]
pub enum JobResult {
    /// Job completed successfully.
    Success,
    /// Job failed, should be retried.
    Retry(String),
    /// Job failed permanently, should not be retried.
    Failed(String),
}

/// Job handler function type.
pub type JobHandler =
    Box<dyn Fn(Job) -> Pin<Box<dyn Future<Output = JobResult> + Send>> + Send + Sync>;

/// Box an async closure as a [`JobHandler`].
pub fn handler_fn<F, Fut>(f: F) -> JobHandler
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobResult> + Send + 'static,
{
    Box::new(move |job: Job| -> Pin<Box<dyn Future<Output = JobResult> + Send>> {
        Box::pin(f(job))
    })
}

/// Job queue trait - abstraction over job queue backends.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job for processing.
    async fn enqueue(&self, job: Job) -> Result<(), JobQueueError>;

    /// Start processing jobs with the given handler.
    async fn start_worker(&self, handler: JobHandler) -> Result<(), JobQueueError>;

    /// Get queue statistics.
    async fn stats(&self) -> Result<QueueStats, JobQueueError>;
}

/// Queue statistics.
#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Job queue errors.
#[derive(Debug, thiserror::Error)]
pub enum JobQueueError {
    #[error("Failed to enqueue job: {0}")]
    EnqueueError(String),

    #[error("Queue is full")]
    QueueFull,

    #[error("Backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn test_payload_roundtrip() {
        let job = Job::with_payload("test", &Payload { value: 7 }).unwrap();
        assert_eq!(job.job_type, "test");
        assert_eq!(job.payload_as::<Payload>().unwrap(), Payload { value: 7 });
    }

    #[test]
    fn test_delayed_job_not_due() {
        let job = Job::new("later", serde_json::json!({})).delayed(chrono::Duration::hours(1));
        assert!(!job.is_due());
        assert!(Job::new("now", serde_json::json!({})).is_due());
    }
}
