// Storage layer for Studio
// Decision: Support both PostgreSQL (production) and in-memory (dev mode)
//
// This crate provides database implementations for core traits:
// - DbTaskSource: implements RecordSource for task replay
// - DbNotificationSource: implements RecordSource for notification replay
//   and the pending -> sent transition

pub mod backend;
pub mod memory;
pub mod models;
pub mod record_sources;
pub mod repositories;

pub use backend::StorageBackend;
pub use memory::InMemoryDatabase;
pub use models::*;
pub use record_sources::{
    create_db_notification_source, create_db_task_source, DbNotificationSource, DbTaskSource,
};
pub use repositories::*;
