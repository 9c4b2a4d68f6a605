use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::{Notification, Page, PageRequest};
use crate::error::DomainError;
use crate::ports::{Job, JobResult, NotificationRepository, ProfileRepository};

use super::jobs::{self, NotificationPayload};

/// A notification with the actor's username resolved.
#[derive(Debug, Clone)]
pub struct NotificationView {
    pub notification: Notification,
    pub actor_username: String,
}

/// Inbox reads plus the background side of notification fan-out.
#[derive(Clone)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl NotificationService {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self {
            notifications,
            profiles,
        }
    }

    pub async fn list(
        &self,
        viewer_id: Uuid,
        page: PageRequest,
    ) -> Result<(Page<NotificationView>, u64), DomainError> {
        let notifications = self.notifications.list_for(viewer_id, page).await?;
        let unread = self.notifications.unread_count(viewer_id).await?;

        let actor_ids: Vec<Uuid> = notifications
            .items
            .iter()
            .map(|n| n.actor_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let usernames: HashMap<Uuid, String> = if actor_ids.is_empty() {
            HashMap::new()
        } else {
            self.profiles
                .find_many(&actor_ids)
                .await?
                .into_iter()
                .map(|p| (p.user_id, p.username))
                .collect()
        };

        let views = notifications.map(|notification| NotificationView {
            actor_username: usernames
                .get(&notification.actor_id)
                .cloned()
                .unwrap_or_default(),
            notification,
        });
        Ok((views, unread))
    }

    pub async fn mark_all_read(&self, viewer_id: Uuid) -> Result<u64, DomainError> {
        let marked = self.notifications.mark_all_read(viewer_id).await?;
        tracing::debug!(user_id = %viewer_id, marked, "Notifications marked read");
        Ok(marked)
    }

    /// Drop read notifications older than `days`.
    pub async fn prune(&self, days: i64) -> Result<u64, DomainError> {
        let cutoff = Utc::now() - Duration::days(days);
        let removed = self.notifications.prune_read_before(cutoff).await?;
        tracing::info!(removed, days, "Pruned read notifications");
        Ok(removed)
    }

    /// Persist the notification carried by a `notification.*` job.
    pub async fn deliver(&self, job: &Job) -> JobResult {
        let Some(kind) = jobs::notification_kind_for(&job.job_type) else {
            return JobResult::Failed(format!("not a notification job: {}", job.job_type));
        };
        let payload: NotificationPayload = match job.payload_as() {
            Ok(payload) => payload,
            Err(e) => return JobResult::Failed(format!("malformed payload: {e}")),
        };
        if payload.recipient_id == payload.actor_id {
            return JobResult::Success;
        }

        let notification = Notification::new(
            payload.recipient_id,
            payload.actor_id,
            kind,
            payload.post_id,
        );
        match self.notifications.save(notification).await {
            Ok(saved) => {
                tracing::debug!(
                    notification_id = %saved.id,
                    recipient = %saved.recipient_id,
                    kind = %saved.kind,
                    "Notification stored"
                );
                JobResult::Success
            }
            Err(e) => JobResult::Retry(e.to_string()),
        }
    }
}
