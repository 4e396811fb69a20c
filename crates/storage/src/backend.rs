// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// This module provides a unified StorageBackend enum that can work with
// either PostgreSQL (production) or in-memory (dev mode) storage.

use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::memory::InMemoryDatabase;
use crate::models::*;
use crate::repositories::Database;

/// Storage backend that can be either PostgreSQL or in-memory
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(Database),
    /// In-memory database (dev mode)
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    /// Create a PostgreSQL storage backend from a database URL.
    /// Migrations are applied before the backend is returned.
    pub async fn postgres(database_url: &str) -> Result<Self> {
        let db = Database::from_url(database_url).await?;
        db.migrate().await?;
        Ok(Self::Postgres(db))
    }

    /// Create an in-memory storage backend
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    /// Check if this is dev mode (in-memory)
    pub fn is_dev_mode(&self) -> bool {
        matches!(self, Self::InMemory(_))
    }

    /// Get the PostgreSQL pool if using PostgreSQL backend
    /// Returns None for in-memory backend
    pub fn pool(&self) -> Option<&PgPool> {
        match self {
            Self::Postgres(db) => Some(db.pool()),
            Self::InMemory(_) => None,
        }
    }

    // ============================================
    // Tasks
    // ============================================

    pub async fn create_task(&self, input: CreateTaskRow) -> Result<TaskRow> {
        match self {
            Self::Postgres(db) => db.create_task(input).await,
            Self::InMemory(db) => db.create_task(input).await,
        }
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Option<TaskRow>> {
        match self {
            Self::Postgres(db) => db.get_task(id).await,
            Self::InMemory(db) => db.get_task(id).await,
        }
    }

    pub async fn list_tasks(&self, owner_id: Uuid, query: &TaskQuery) -> Result<Vec<TaskRow>> {
        match self {
            Self::Postgres(db) => db.list_tasks(owner_id, query).await,
            Self::InMemory(db) => db.list_tasks(owner_id, query).await,
        }
    }

    pub async fn update_task(&self, id: Uuid, input: UpdateTaskRow) -> Result<Option<TaskRow>> {
        match self {
            Self::Postgres(db) => db.update_task(id, input).await,
            Self::InMemory(db) => db.update_task(id, input).await,
        }
    }

    // ============================================
    // Notifications
    // ============================================

    pub async fn create_notification(
        &self,
        input: CreateNotificationRow,
    ) -> Result<NotificationRow> {
        match self {
            Self::Postgres(db) => db.create_notification(input).await,
            Self::InMemory(db) => db.create_notification(input).await,
        }
    }

    pub async fn get_notification(&self, id: Uuid) -> Result<Option<NotificationRow>> {
        match self {
            Self::Postgres(db) => db.get_notification(id).await,
            Self::InMemory(db) => db.get_notification(id).await,
        }
    }

    pub async fn list_notifications(
        &self,
        owner_id: Uuid,
        query: &NotificationQuery,
    ) -> Result<Vec<NotificationRow>> {
        match self {
            Self::Postgres(db) => db.list_notifications(owner_id, query).await,
            Self::InMemory(db) => db.list_notifications(owner_id, query).await,
        }
    }

    pub async fn mark_notification_sent(&self, id: Uuid) -> Result<Option<NotificationRow>> {
        match self {
            Self::Postgres(db) => db.mark_notification_sent(id).await,
            Self::InMemory(db) => db.mark_notification_sent(id).await,
        }
    }

    pub async fn mark_notification_read(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<NotificationRow>> {
        match self {
            Self::Postgres(db) => db.mark_notification_read(id, owner_id).await,
            Self::InMemory(db) => db.mark_notification_read(id, owner_id).await,
        }
    }

    pub async fn mark_notification_deleted(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<NotificationRow>> {
        match self {
            Self::Postgres(db) => db.mark_notification_deleted(id, owner_id).await,
            Self::InMemory(db) => db.mark_notification_deleted(id, owner_id).await,
        }
    }
}
