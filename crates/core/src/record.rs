// Record abstractions for the event stream hub
//
// The hub is generic over record kind. Each kind describes how it is
// identified, who owns it, and whether it still awaits its first delivery;
// a RecordSource knows how to fetch replay candidates and how to persist
// the delivered transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;

/// A persisted record that is streamed to its owner.
pub trait EventRecord: Serialize + Clone + Send + Sync + 'static {
    /// Human-readable kind name, used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> Uuid;

    /// The only user this record may ever be dispatched to.
    fn owner_id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;

    /// Replay cursor. Strictly increases on every visible mutation.
    fn updated_at(&self) -> DateTime<Utc>;

    /// Whether the record still waits for its first successful dispatch.
    fn is_undelivered(&self) -> bool {
        false
    }

    /// JSON body of the `data:` line.
    fn frame_payload(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Store-side operations the hub needs for one record kind.
#[async_trait]
pub trait RecordSource: Send + Sync + 'static {
    type Record: EventRecord;

    /// Records owned by `owner_id` that a (re)connecting client must see,
    /// ordered by `created_at` ascending. With `resume_after`, only records
    /// whose `updated_at` is strictly greater are returned.
    async fn fetch_for_replay(
        &self,
        owner_id: Uuid,
        resume_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self::Record>>;

    /// Persist the undelivered -> delivered transition.
    ///
    /// Returns the updated record, or `None` when nothing changed (already
    /// delivered by a concurrent dispatch, or the kind has no delivery state).
    async fn mark_delivered(&self, record: &Self::Record) -> Result<Option<Self::Record>>;
}
