// Database models (internal, may differ from public DTOs)

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use studio_core::{Notification, NotificationStatus, Task, TaskKind, TaskStatus};
use uuid::Uuid;

// ============================================
// Task models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub project_id: Uuid,
    pub kind: String,
    pub status: String,
    pub progress: i32,
    pub error: Option<String>,
    pub params: Option<sqlx::types::JsonValue>,
    pub result: Option<sqlx::types::JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTaskRow {
    pub owner_id: Uuid,
    pub project_id: Uuid,
    pub kind: TaskKind,
    pub params: Option<serde_json::Value>,
}

/// Partial task update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskRow {
    pub kind: Option<TaskKind>,
    pub status: Option<TaskStatus>,
    pub progress: Option<i32>,
    pub error: Option<String>,
    pub result: Option<serde_json::Value>,
}

impl UpdateTaskRow {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.status.is_none()
            && self.progress.is_none()
            && self.error.is_none()
            && self.result.is_none()
    }
}

/// Filters for task listing. `None` means "no filter".
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub statuses: Option<Vec<TaskStatus>>,
    pub updated_after: Option<DateTime<Utc>>,
}

impl TaskQuery {
    pub fn active() -> Self {
        Self {
            statuses: Some(TaskStatus::ACTIVE.to_vec()),
            updated_after: None,
        }
    }

    pub fn updated_after(cursor: DateTime<Utc>) -> Self {
        Self {
            statuses: None,
            updated_after: Some(cursor),
        }
    }

    pub(crate) fn status_strings(&self) -> Option<Vec<String>> {
        self.statuses
            .as_ref()
            .map(|s| s.iter().map(|st| st.as_str().to_string()).collect())
    }

    pub(crate) fn matches(&self, row: &TaskRow) -> bool {
        let status_ok = self
            .statuses
            .as_ref()
            .map_or(true, |s| s.iter().any(|st| st.as_str() == row.status));
        let cursor_ok = self.updated_after.map_or(true, |c| row.updated_at > c);
        status_ok && cursor_ok
    }
}

impl TryFrom<TaskRow> for Task {
    type Error = anyhow::Error;

    fn try_from(row: TaskRow) -> Result<Self> {
        Ok(Task {
            id: row.id,
            owner_id: row.owner_id,
            project_id: row.project_id,
            kind: row.kind.parse().map_err(|e: String| anyhow!(e))?,
            status: row.status.parse().map_err(|e: String| anyhow!(e))?,
            progress: row.progress,
            error: row.error,
            params: row.params,
            result: row.result,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ============================================
// Notification models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub task_id: Uuid,
    pub message: String,
    pub status: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateNotificationRow {
    pub owner_id: Uuid,
    pub task_id: Uuid,
    pub message: String,
}

/// Filters for notification listing. Deleted notifications are excluded
/// unless `include_deleted` is set.
#[derive(Debug, Clone, Default)]
pub struct NotificationQuery {
    pub statuses: Option<Vec<NotificationStatus>>,
    pub updated_after: Option<DateTime<Utc>>,
    pub include_deleted: bool,
}

impl NotificationQuery {
    /// Pending and sent, not deleted, optionally newer than `cursor`.
    pub fn replayable(cursor: Option<DateTime<Utc>>) -> Self {
        Self {
            statuses: Some(NotificationStatus::REPLAYABLE.to_vec()),
            updated_after: cursor,
            include_deleted: false,
        }
    }

    pub(crate) fn status_strings(&self) -> Option<Vec<String>> {
        self.statuses
            .as_ref()
            .map(|s| s.iter().map(|st| st.as_str().to_string()).collect())
    }

    pub(crate) fn matches(&self, row: &NotificationRow) -> bool {
        let deleted_ok = self.include_deleted || !row.is_deleted;
        let status_ok = self
            .statuses
            .as_ref()
            .map_or(true, |s| s.iter().any(|st| st.as_str() == row.status));
        let cursor_ok = self.updated_after.map_or(true, |c| row.updated_at > c);
        deleted_ok && status_ok && cursor_ok
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = anyhow::Error;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: row.id,
            owner_id: row.owner_id,
            task_id: row.task_id,
            message: row.message,
            status: row.status.parse().map_err(|e: String| anyhow!(e))?,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
            sent_at: row.sent_at,
            read_at: row.read_at,
        })
    }
}
