// Notification service for business logic
//
// Entry point for notification producers (task status changes, the test
// endpoint) and for the owner's read/delete actions. Creation always goes
// through the notification hub so the record is either written to a live
// stream and marked sent, or left pending for replay.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use studio_core::{HubError, Notification, Result, Subscription};
use studio_storage::{CreateNotificationRow, NotificationQuery, StorageBackend};
use uuid::Uuid;

use super::NotificationHub;

pub struct NotificationService {
    db: Arc<StorageBackend>,
    hub: Arc<NotificationHub>,
}

impl NotificationService {
    pub fn new(db: Arc<StorageBackend>, hub: Arc<NotificationHub>) -> Self {
        Self { db, hub }
    }

    /// Open a notification stream for `owner_id`
    pub async fn connect(
        &self,
        owner_id: Uuid,
        resume_after: Option<DateTime<Utc>>,
    ) -> Result<Subscription> {
        self.hub.connect(owner_id, resume_after).await
    }

    /// Persist a new notification and dispatch it to the owner's streams.
    /// Returns the notification as stored after dispatch.
    pub async fn create_and_dispatch(
        &self,
        owner_id: Uuid,
        task_id: Uuid,
        message: impl Into<String>,
    ) -> Result<Notification> {
        let row = self
            .db
            .create_notification(CreateNotificationRow {
                owner_id,
                task_id,
                message: message.into(),
            })
            .await?;
        let notification = Notification::try_from(row)?;

        tracing::debug!(
            user_id = %owner_id,
            record_id = %notification.id,
            task_id = %task_id,
            "Notification created"
        );

        self.hub.publish(notification).await
    }

    /// Mark as read. `NotFound` unless the notification exists, belongs to
    /// `owner_id` and is not deleted.
    pub async fn mark_read(&self, id: Uuid, owner_id: Uuid) -> Result<Notification> {
        let row = self
            .db
            .mark_notification_read(id, owner_id)
            .await?
            .ok_or_else(|| HubError::not_found("Notification", id))?;
        Ok(Notification::try_from(row)?)
    }

    /// Soft delete. Idempotent for the owner; `NotFound` for anyone else.
    pub async fn mark_deleted(&self, id: Uuid, owner_id: Uuid) -> Result<Notification> {
        let row = self
            .db
            .mark_notification_deleted(id, owner_id)
            .await?
            .ok_or_else(|| HubError::not_found("Notification", id))?;
        Ok(Notification::try_from(row)?)
    }

    /// Non-deleted notifications of `owner_id`, oldest first
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Notification>> {
        let rows = self
            .db
            .list_notifications(owner_id, &NotificationQuery::default())
            .await?;
        let notifications = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(notifications)
    }
}
