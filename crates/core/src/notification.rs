// Notification domain types
//
// Notifications are short user-facing messages (usually about task status
// changes). Lifecycle: pending -> sent -> read, with a soft-delete flag that
// hides the record from replay and listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::record::EventRecord;

/// Notification delivery status.
/// - `pending`: stored, not yet written to any live stream
/// - `sent`: written to at least one live stream
/// - `read`: acknowledged by the user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    Read,
}

impl NotificationStatus {
    /// Statuses eligible for replay.
    pub const REPLAYABLE: [NotificationStatus; 2] =
        [NotificationStatus::Pending, NotificationStatus::Sent];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Read => "read",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NotificationStatus::Pending),
            "sent" => Ok(NotificationStatus::Sent),
            "read" => Ok(NotificationStatus::Read),
            other => Err(format!("unknown notification status: {other}")),
        }
    }
}

/// Notification - a message addressed to exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Notification {
    /// Unique identifier for the notification.
    pub id: Uuid,
    /// Recipient.
    pub owner_id: Uuid,
    /// Task this notification is about.
    pub task_id: Uuid,
    /// Human-readable message.
    pub message: String,
    pub status: NotificationStatus,
    /// Soft-delete flag. Deleted notifications are never replayed.
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

/// Body of a notification frame on the wire.
#[derive(Debug, Serialize)]
struct NotificationPayload<'a> {
    id: Uuid,
    task_id: Uuid,
    message: &'a str,
    status: NotificationStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EventRecord for Notification {
    const KIND: &'static str = "Notification";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn is_undelivered(&self) -> bool {
        self.status == NotificationStatus::Pending && !self.is_deleted
    }

    fn frame_payload(&self) -> crate::error::Result<serde_json::Value> {
        Ok(serde_json::to_value(NotificationPayload {
            id: self.id,
            task_id: self.task_id,
            message: &self.message,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })?)
    }
}
