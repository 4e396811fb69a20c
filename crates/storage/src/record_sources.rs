// Store-backed record sources for the event stream hub
//
// Replay rules per kind:
// - Tasks: without a cursor, everything still in flight (pending, running);
//   with a cursor, every task touched after it, whatever its status.
// - Notifications: pending or sent, not deleted, touched after the cursor
//   when one is given.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use studio_core::{Notification, RecordSource, Result, Task};
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::models::{NotificationQuery, TaskQuery};

// ============================================================================
// DbTaskSource
// ============================================================================

#[derive(Clone)]
pub struct DbTaskSource {
    db: Arc<StorageBackend>,
}

impl DbTaskSource {
    pub fn new(db: Arc<StorageBackend>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordSource for DbTaskSource {
    type Record = Task;

    async fn fetch_for_replay(
        &self,
        owner_id: Uuid,
        resume_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<Task>> {
        let query = match resume_after {
            Some(cursor) => TaskQuery::updated_after(cursor),
            None => TaskQuery::active(),
        };
        let rows = self.db.list_tasks(owner_id, &query).await?;
        let tasks = rows
            .into_iter()
            .map(Task::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Tasks carry no delivery state.
    async fn mark_delivered(&self, _record: &Task) -> Result<Option<Task>> {
        Ok(None)
    }
}

/// Helper function to create a task source
pub fn create_db_task_source(db: Arc<StorageBackend>) -> DbTaskSource {
    DbTaskSource::new(db)
}

// ============================================================================
// DbNotificationSource
// ============================================================================

#[derive(Clone)]
pub struct DbNotificationSource {
    db: Arc<StorageBackend>,
}

impl DbNotificationSource {
    pub fn new(db: Arc<StorageBackend>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordSource for DbNotificationSource {
    type Record = Notification;

    async fn fetch_for_replay(
        &self,
        owner_id: Uuid,
        resume_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<Notification>> {
        let rows = self
            .db
            .list_notifications(owner_id, &NotificationQuery::replayable(resume_after))
            .await?;
        let notifications = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(notifications)
    }

    async fn mark_delivered(&self, record: &Notification) -> Result<Option<Notification>> {
        match self.db.mark_notification_sent(record.id).await? {
            Some(row) => Ok(Some(Notification::try_from(row)?)),
            None => Ok(None),
        }
    }
}

/// Helper function to create a notification source
pub fn create_db_notification_source(db: Arc<StorageBackend>) -> DbNotificationSource {
    DbNotificationSource::new(db)
}
