// Real-Time Event Delivery Core
//
// This crate provides a DB-agnostic event stream hub that pushes task and
// notification records to their owners over Server-Sent Events.
//
// Key design decisions:
// - The store is the source of truth; the connection registry is process-local
//   and only knows which streams are open right now
// - The hub is generic over record kind via traits (EventRecord, RecordSource)
// - `updated_at` is the replay cursor and the SSE event id
// - Writes never block: a full or closed stream is torn down, never waited on
// - Domain entity types (Task, Notification) are defined here

pub mod clock;
pub mod error;
pub mod frame;
pub mod hub;
pub mod record;
pub mod registry;

// Domain entity types
pub mod notification;
pub mod task;

// Logging setup shared by binaries
pub mod telemetry;

// Re-exports for convenience
pub use clock::monotonic_now;
pub use error::{HubError, Result};
pub use frame::{format_cursor, parse_cursor, Frame};
pub use hub::{EventStreamHub, HubConfig, Subscription};
pub use notification::{Notification, NotificationStatus};
pub use record::{EventRecord, RecordSource};
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, FrameSink};
pub use task::{Task, TaskKind, TaskStatus};
