//! Cron-style job scheduler using tokio-cron-scheduler.
//!
//! Scheduled tasks only enqueue jobs; the queue's workers do the work, so a
//! maintenance run gets the same retry policy as any other job.

use std::sync::Arc;

use nexsocial_core::ports::{Job, JobQueue};
use nexsocial_core::services::jobs::{PRUNE_NOTIFICATIONS, PrunePayload};
use tokio_cron_scheduler::{Job as CronJob, JobScheduler, JobSchedulerError};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Enable scheduler.
    pub enabled: bool,
    /// Read notifications older than this are pruned.
    pub retention_days: i64,
    /// Six-field cron expression (with seconds) for the prune run.
    pub prune_schedule: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: 30,
            prune_schedule: "0 0 3 * * *".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.enabled),
            retention_days: std::env::var("NOTIFICATION_RETENTION_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|d: &i64| *d > 0)
                .unwrap_or(defaults.retention_days),
            prune_schedule: std::env::var("NOTIFICATION_PRUNE_SCHEDULE")
                .unwrap_or(defaults.prune_schedule),
        }
    }
}

/// Cron job scheduler wrapper.
pub struct Scheduler {
    inner: JobScheduler,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a new scheduler.
    pub async fn new(config: SchedulerConfig) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, config })
    }

    /// Add a cron job.
    ///
    /// # Example
    /// ```ignore
    /// scheduler.add_cron("0 0 * * * *", || async {
    ///     tracing::info!("Running hourly job");
    /// }).await?;
    /// ```
    pub async fn add_cron<F, Fut>(
        &self,
        schedule: &str,
        task: F,
    ) -> Result<uuid::Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(id)
    }

    /// Register the maintenance jobs.
    pub async fn register_maintenance(
        &self,
        queue: Arc<dyn JobQueue>,
    ) -> Result<(), JobSchedulerError> {
        let payload = PrunePayload {
            older_than_days: self.config.retention_days,
        };
        self.add_cron(&self.config.prune_schedule, move || {
            let queue = queue.clone();
            let payload = payload.clone();
            async move {
                match Job::with_payload(PRUNE_NOTIFICATIONS, &payload) {
                    Ok(job) => {
                        if let Err(e) = queue.enqueue(job).await {
                            tracing::error!(error = %e, "Failed to enqueue notification prune");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to build notification prune job"),
                }
            }
        })
        .await?;
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if !self.config.enabled {
            tracing::info!("Scheduler disabled");
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let config = SchedulerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.retention_days, 30);
        assert_eq!(config.prune_schedule.split_whitespace().count(), 6);
    }
}
