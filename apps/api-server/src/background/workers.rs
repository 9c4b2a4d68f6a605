//! Job handlers: route each queued job to the service that owns it.

use nexsocial_core::DomainError;
use nexsocial_core::ports::{Job, JobHandler, JobQueueError, JobResult, handler_fn};
use nexsocial_core::services::jobs::{
    self, MEDIA_CLEANUP, MediaCleanupPayload, PRUNE_NOTIFICATIONS, PrunePayload,
};

use crate::state::AppState;

/// Dispatch one job.
pub async fn handle_job(state: &AppState, job: Job) -> JobResult {
    tracing::debug!(job_id = %job.id, job_type = %job.job_type, attempt = job.attempts, "Handling job");

    if jobs::notification_kind_for(&job.job_type).is_some() {
        return state.notifications.deliver(&job).await;
    }

    match job.job_type.as_str() {
        MEDIA_CLEANUP => {
            let payload: MediaCleanupPayload = match job.payload_as() {
                Ok(payload) => payload,
                Err(e) => return JobResult::Failed(format!("malformed payload: {e}")),
            };
            match state.media.delete(&payload.key).await {
                Ok(()) => JobResult::Success,
                Err(DomainError::Validation(msg)) => JobResult::Failed(msg),
                Err(e) => JobResult::Retry(e.to_string()),
            }
        }
        PRUNE_NOTIFICATIONS => {
            let payload: PrunePayload = match job.payload_as() {
                Ok(payload) => payload,
                Err(e) => return JobResult::Failed(format!("malformed payload: {e}")),
            };
            match state.notifications.prune(payload.older_than_days).await {
                Ok(_) => JobResult::Success,
                Err(e) => JobResult::Retry(e.to_string()),
            }
        }
        other => JobResult::Failed(format!("unknown job type: {other}")),
    }
}

/// Boxed handler over a clone of the state.
pub fn job_handler(state: AppState) -> JobHandler {
    handler_fn(move |job: Job| {
        let state = state.clone();
        async move { handle_job(&state, job).await }
    })
}

/// Start the queue's workers.
pub async fn start(state: &AppState) -> Result<(), JobQueueError> {
    state.jobs.start_worker(job_handler(state.clone())).await?;
    tracing::info!(backend = state.backends.jobs, "Background workers started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexsocial_core::domain::PageRequest;
    use nexsocial_core::services::jobs::{NOTIFY_FOLLOW, NotificationPayload};
    use nexsocial_core::services::RegisterInput;

    fn register_input(username: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "Str0ng!pass".to_string(),
            password2: "Str0ng!pass".to_string(),
        }
    }

    #[tokio::test]
    async fn test_notification_job_reaches_inbox() {
        let state = AppState::in_memory();
        let (alice, _) = state.accounts.register(register_input("alice")).await.unwrap();
        let (bob, _) = state.accounts.register(register_input("bob")).await.unwrap();

        let job = Job::with_payload(
            NOTIFY_FOLLOW,
            &NotificationPayload {
                recipient_id: alice.id,
                actor_id: bob.id,
                post_id: None,
            },
        )
        .unwrap();
        assert!(matches!(handle_job(&state, job).await, JobResult::Success));

        let (page, unread) = state
            .notifications
            .list(alice.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(unread, 1);
        assert_eq!(page.items[0].actor_username, "bob");
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_jobs_fail_permanently() {
        let state = AppState::in_memory();

        let unknown = Job::new("email.send", serde_json::json!({}));
        assert!(matches!(handle_job(&state, unknown).await, JobResult::Failed(_)));

        let malformed = Job::new(MEDIA_CLEANUP, serde_json::json!({ "path": 1 }));
        assert!(matches!(handle_job(&state, malformed).await, JobResult::Failed(_)));

        let bad_key = Job::with_payload(
            MEDIA_CLEANUP,
            &MediaCleanupPayload {
                key: "../secret".to_string(),
            },
        )
        .unwrap();
        assert!(matches!(handle_job(&state, bad_key).await, JobResult::Failed(_)));
    }

    #[tokio::test]
    async fn test_prune_job_succeeds() {
        let state = AppState::in_memory();
        let job = Job::with_payload(PRUNE_NOTIFICATIONS, &PrunePayload { older_than_days: 30 }).unwrap();
        assert!(matches!(handle_job(&state, job).await, JobResult::Success));
    }
}
