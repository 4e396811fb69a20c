// Task service for business logic
//
// Tasks are created by the owner and driven by workers through partial
// updates. Every write is dispatched through the task hub; a status change
// additionally produces a notification for the owner.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use studio_core::{HubError, Notification, Result, Subscription, Task};
use studio_storage::{CreateTaskRow, StorageBackend, TaskQuery, UpdateTaskRow};
use uuid::Uuid;

use super::{NotificationService, TaskHub};
use crate::api::tasks::{CreateTaskRequest, UpdateTaskRequest};

pub struct TaskService {
    db: Arc<StorageBackend>,
    hub: Arc<TaskHub>,
    notifications: Arc<NotificationService>,
}

impl TaskService {
    pub fn new(
        db: Arc<StorageBackend>,
        hub: Arc<TaskHub>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            db,
            hub,
            notifications,
        }
    }

    /// Open a task stream for `owner_id`
    pub async fn connect(
        &self,
        owner_id: Uuid,
        resume_after: Option<DateTime<Utc>>,
    ) -> Result<Subscription> {
        self.hub.connect(owner_id, resume_after).await
    }

    /// Persist a new pending task and dispatch it to the owner's streams
    pub async fn create_and_dispatch(&self, owner_id: Uuid, req: CreateTaskRequest) -> Result<Task> {
        let row = self
            .db
            .create_task(CreateTaskRow {
                owner_id,
                project_id: req.project_id,
                kind: req.kind,
                params: req.params,
            })
            .await?;
        let task = Task::try_from(row)?;

        tracing::info!(
            user_id = %owner_id,
            record_id = %task.id,
            kind = %task.kind,
            "Task created"
        );

        self.hub.publish(task).await
    }

    /// Apply a partial update and dispatch the result.
    ///
    /// `NotFound` unless the task belongs to `owner_id`. When the status
    /// changes, a notification ("<title> <phrase>") is created and
    /// dispatched to the owner as well.
    pub async fn update_and_dispatch(
        &self,
        id: Uuid,
        owner_id: Uuid,
        req: UpdateTaskRequest,
    ) -> Result<Task> {
        let previous = self
            .db
            .get_task(id)
            .await?
            .filter(|row| row.owner_id == owner_id)
            .ok_or_else(|| HubError::not_found("Task", id))?;

        let row = self
            .db
            .update_task(
                id,
                UpdateTaskRow {
                    kind: req.kind,
                    status: req.status,
                    progress: req.progress,
                    error: req.error,
                    result: req.result,
                },
            )
            .await?
            .ok_or_else(|| HubError::not_found("Task", id))?;
        let task = Task::try_from(row)?;

        let status_changed = task.status.as_str() != previous.status;
        tracing::debug!(
            user_id = %task.owner_id,
            record_id = %task.id,
            status = %task.status,
            progress = task.progress,
            status_changed,
            "Task updated"
        );

        let task = self.hub.publish(task).await?;

        if status_changed {
            self.notify_status_change(&task).await?;
        }

        Ok(task)
    }

    async fn notify_status_change(&self, task: &Task) -> Result<Notification> {
        self.notifications
            .create_and_dispatch(task.owner_id, task.id, task.status_message())
            .await
    }

    /// Task by id, visible only to its owner
    pub async fn get_for_owner(&self, id: Uuid, owner_id: Uuid) -> Result<Task> {
        let row = self
            .db
            .get_task(id)
            .await?
            .filter(|row| row.owner_id == owner_id)
            .ok_or_else(|| HubError::not_found("Task", id))?;
        Ok(Task::try_from(row)?)
    }

    /// All tasks of `owner_id`, oldest first
    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Task>> {
        let rows = self.db.list_tasks(owner_id, &TaskQuery::default()).await?;
        let tasks = rows
            .into_iter()
            .map(Task::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(tasks)
    }
}
