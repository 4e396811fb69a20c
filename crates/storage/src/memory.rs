// In-memory storage implementation for dev mode
// Decision: Use parking_lot for thread-safe access
// Decision: UUIDs generated via uuid v7 (time-ordered)
//
// This implementation provides a PostgreSQL-compatible API backed by in-memory
// HashMaps, allowing the control-plane to run without a database for development
// and tests. Conditional updates happen under a single write lock, matching the
// row-level atomicity of the SQL statements.

use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use studio_core::{monotonic_now, NotificationStatus};
use uuid::Uuid;

use crate::models::*;

/// In-memory database for dev mode
/// All data is stored in memory and lost on restart
#[derive(Default)]
pub struct InMemoryDatabase {
    tasks: RwLock<HashMap<Uuid, TaskRow>>,
    notifications: RwLock<HashMap<Uuid, NotificationRow>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================
    // Tasks
    // ============================================

    pub async fn create_task(&self, input: CreateTaskRow) -> Result<TaskRow> {
        let now = monotonic_now();
        let id = Uuid::now_v7();
        let row = TaskRow {
            id,
            owner_id: input.owner_id,
            project_id: input.project_id,
            kind: input.kind.as_str().to_string(),
            status: studio_core::TaskStatus::Pending.as_str().to_string(),
            progress: 0,
            error: None,
            params: input.params,
            result: None,
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().insert(id, row.clone());
        Ok(row)
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Option<TaskRow>> {
        Ok(self.tasks.read().get(&id).cloned())
    }

    pub async fn list_tasks(&self, owner_id: Uuid, query: &TaskQuery) -> Result<Vec<TaskRow>> {
        let mut rows: Vec<_> = self
            .tasks
            .read()
            .values()
            .filter(|t| t.owner_id == owner_id && query.matches(t))
            .cloned()
            .collect();
        rows.sort_by_key(|t| (t.created_at, t.id));
        Ok(rows)
    }

    pub async fn update_task(&self, id: Uuid, input: UpdateTaskRow) -> Result<Option<TaskRow>> {
        let mut tasks = self.tasks.write();
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(kind) = input.kind {
            task.kind = kind.as_str().to_string();
        }
        if let Some(status) = input.status {
            task.status = status.as_str().to_string();
        }
        if let Some(progress) = input.progress {
            task.progress = progress;
        }
        if let Some(error) = input.error {
            task.error = Some(error);
        }
        if let Some(result) = input.result {
            task.result = Some(result);
        }
        task.updated_at = monotonic_now();
        Ok(Some(task.clone()))
    }

    // ============================================
    // Notifications
    // ============================================

    pub async fn create_notification(
        &self,
        input: CreateNotificationRow,
    ) -> Result<NotificationRow> {
        let now = monotonic_now();
        let id = Uuid::now_v7();
        let row = NotificationRow {
            id,
            owner_id: input.owner_id,
            task_id: input.task_id,
            message: input.message,
            status: NotificationStatus::Pending.as_str().to_string(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
            sent_at: None,
            read_at: None,
        };
        self.notifications.write().insert(id, row.clone());
        Ok(row)
    }

    pub async fn get_notification(&self, id: Uuid) -> Result<Option<NotificationRow>> {
        Ok(self.notifications.read().get(&id).cloned())
    }

    pub async fn list_notifications(
        &self,
        owner_id: Uuid,
        query: &NotificationQuery,
    ) -> Result<Vec<NotificationRow>> {
        let mut rows: Vec<_> = self
            .notifications
            .read()
            .values()
            .filter(|n| n.owner_id == owner_id && query.matches(n))
            .cloned()
            .collect();
        rows.sort_by_key(|n| (n.created_at, n.id));
        Ok(rows)
    }

    pub async fn mark_notification_sent(&self, id: Uuid) -> Result<Option<NotificationRow>> {
        let mut notifications = self.notifications.write();
        let Some(n) = notifications.get_mut(&id) else {
            return Ok(None);
        };
        if n.is_deleted || n.status != NotificationStatus::Pending.as_str() {
            return Ok(None);
        }
        let now = monotonic_now();
        n.status = NotificationStatus::Sent.as_str().to_string();
        n.sent_at = Some(now);
        n.updated_at = now;
        Ok(Some(n.clone()))
    }

    pub async fn mark_notification_read(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<NotificationRow>> {
        let mut notifications = self.notifications.write();
        let Some(n) = notifications
            .get_mut(&id)
            .filter(|n| n.owner_id == owner_id && !n.is_deleted)
        else {
            return Ok(None);
        };
        let now = monotonic_now();
        n.status = NotificationStatus::Read.as_str().to_string();
        n.read_at.get_or_insert(now);
        n.updated_at = now;
        Ok(Some(n.clone()))
    }

    pub async fn mark_notification_deleted(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<NotificationRow>> {
        let mut notifications = self.notifications.write();
        let Some(n) = notifications
            .get_mut(&id)
            .filter(|n| n.owner_id == owner_id)
        else {
            return Ok(None);
        };
        if !n.is_deleted {
            n.is_deleted = true;
            n.updated_at = monotonic_now();
        }
        Ok(Some(n.clone()))
    }
}
