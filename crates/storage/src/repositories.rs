// Repository layer for database operations
//
// Timestamps are supplied by the application through `monotonic_now()` so
// that every write moves `updated_at` strictly forward. Statuses are bound as
// plain text.

use anyhow::Result;
use sqlx::PgPool;
use studio_core::{monotonic_now, NotificationStatus};
use uuid::Uuid;

use crate::models::*;

const TASK_COLUMNS: &str =
    "id, owner_id, project_id, kind, status, progress, error, params, result, created_at, updated_at";

const NOTIFICATION_COLUMNS: &str =
    "id, owner_id, task_id, message, status, is_deleted, created_at, updated_at, sent_at, read_at";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Tasks
    // ============================================

    pub async fn create_task(&self, input: CreateTaskRow) -> Result<TaskRow> {
        let now = monotonic_now();
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (id, owner_id, project_id, kind, status, progress, params, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'pending', 0, $5, $6, $6)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(input.owner_id)
        .bind(input.project_id)
        .bind(input.kind.as_str())
        .bind(&input.params)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Owner's tasks matching `query`, oldest first
    pub async fn list_tasks(&self, owner_id: Uuid, query: &TaskQuery) -> Result<Vec<TaskRow>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE owner_id = $1
              AND ($2::text[] IS NULL OR status = ANY($2))
              AND ($3::timestamptz IS NULL OR updated_at > $3)
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(owner_id)
        .bind(query.status_strings())
        .bind(query.updated_after)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn update_task(&self, id: Uuid, input: UpdateTaskRow) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET
                kind = COALESCE($2, kind),
                status = COALESCE($3, status),
                progress = COALESCE($4, progress),
                error = COALESCE($5, error),
                result = COALESCE($6, result),
                updated_at = $7
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.kind.map(|k| k.as_str()))
        .bind(input.status.map(|s| s.as_str()))
        .bind(input.progress)
        .bind(&input.error)
        .bind(&input.result)
        .bind(monotonic_now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ============================================
    // Notifications
    // ============================================

    pub async fn create_notification(
        &self,
        input: CreateNotificationRow,
    ) -> Result<NotificationRow> {
        let now = monotonic_now();
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (id, owner_id, task_id, message, status, is_deleted, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'pending', FALSE, $5, $5)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(input.owner_id)
        .bind(input.task_id)
        .bind(&input.message)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_notification(&self, id: Uuid) -> Result<Option<NotificationRow>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Owner's notifications matching `query`, oldest first
    pub async fn list_notifications(
        &self,
        owner_id: Uuid,
        query: &NotificationQuery,
    ) -> Result<Vec<NotificationRow>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE owner_id = $1
              AND ($2 OR is_deleted = FALSE)
              AND ($3::text[] IS NULL OR status = ANY($3))
              AND ($4::timestamptz IS NULL OR updated_at > $4)
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(owner_id)
        .bind(query.include_deleted)
        .bind(query.status_strings())
        .bind(query.updated_after)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Conditional pending -> sent. Returns `None` when the notification was
    /// not pending anymore (another dispatch got there first).
    pub async fn mark_notification_sent(&self, id: Uuid) -> Result<Option<NotificationRow>> {
        let now = monotonic_now();
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications
            SET status = $2, sent_at = $3, updated_at = $3
            WHERE id = $1 AND status = $4 AND is_deleted = FALSE
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(NotificationStatus::Sent.as_str())
        .bind(now)
        .bind(NotificationStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn mark_notification_read(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<NotificationRow>> {
        let now = monotonic_now();
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications
            SET status = $3, read_at = COALESCE(read_at, $4), updated_at = $4
            WHERE id = $1 AND owner_id = $2 AND is_deleted = FALSE
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(NotificationStatus::Read.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Soft delete. Deleting twice is a no-op that still returns the row.
    pub async fn mark_notification_deleted(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<NotificationRow>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications
            SET is_deleted = TRUE,
                updated_at = CASE WHEN is_deleted THEN updated_at ELSE $3 END
            WHERE id = $1 AND owner_id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(monotonic_now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
