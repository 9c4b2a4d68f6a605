//! Background job types and their payloads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::NotificationKind;
use crate::ports::{Job, JobQueue};

pub const NOTIFY_FOLLOW: &str = "notification.follow";
pub const NOTIFY_LIKE: &str = "notification.like";
pub const NOTIFY_COMMENT: &str = "notification.comment";
pub const NOTIFY_REPLY: &str = "notification.reply";
pub const MEDIA_CLEANUP: &str = "media.cleanup";
pub const PRUNE_NOTIFICATIONS: &str = "notifications.prune";

/// Job type used to deliver a notification of `kind`.
pub fn notification_job_type(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Follow => NOTIFY_FOLLOW,
        NotificationKind::Like => NOTIFY_LIKE,
        NotificationKind::Comment => NOTIFY_COMMENT,
        NotificationKind::Reply => NOTIFY_REPLY,
    }
}

/// Inverse of [`notification_job_type`].
pub fn notification_kind_for(job_type: &str) -> Option<NotificationKind> {
    job_type
        .strip_prefix("notification.")
        .and_then(|kind| kind.parse().ok())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCleanupPayload {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunePayload {
    pub older_than_days: i64,
}

/// Fire-and-forget enqueue; failures are logged only.
pub(crate) async fn dispatch<T: Serialize>(queue: &Arc<dyn JobQueue>, job_type: &str, payload: &T) {
    let job = match Job::with_payload(job_type, payload) {
        Ok(job) => job,
        Err(e) => {
            tracing::error!(job_type, error = %e, "Failed to build job");
            return;
        }
    };
    let job_id = job.id.clone();
    match queue.enqueue(job).await {
        Ok(()) => tracing::debug!(job_type, job_id = %job_id, "Job enqueued"),
        Err(e) => tracing::warn!(job_type, job_id = %job_id, error = %e, "Failed to enqueue job"),
    }
}

/// Queue a notification unless the actor would be notifying themself.
pub(crate) async fn notify(
    queue: &Arc<dyn JobQueue>,
    kind: NotificationKind,
    recipient_id: Uuid,
    actor_id: Uuid,
    post_id: Option<Uuid>,
) {
    if recipient_id == actor_id {
        return;
    }
    let payload = NotificationPayload {
        recipient_id,
        actor_id,
        post_id,
    };
    dispatch(queue, notification_job_type(kind), &payload).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_mapping() {
        for kind in [
            NotificationKind::Follow,
            NotificationKind::Like,
            NotificationKind::Comment,
            NotificationKind::Reply,
        ] {
            assert_eq!(notification_kind_for(notification_job_type(kind)), Some(kind));
        }
        assert_eq!(notification_kind_for(MEDIA_CLEANUP), None);
        assert_eq!(notification_kind_for("notification.poke"), None);
    }

    #[test]
    fn test_payload_omits_missing_post() {
        let payload = NotificationPayload {
            recipient_id: Uuid::nil(),
            actor_id: Uuid::nil(),
            post_id: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("post_id").is_none());

        let parsed: NotificationPayload = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, payload);
    }
}
