// Server-Sent Events frames and the resume cursor
//
// Wire contract:
//   event frame:     "id: <cursor>\ndata: <json>\n\n"
//   heartbeat frame: ": ping\n\n"
//
// The cursor is the record's `updated_at`, rendered as RFC 3339 UTC with
// microsecond precision. Clients echo the last id back in `Last-Event-ID`.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Result;
use crate::record::EventRecord;

/// Comment text written by the heartbeat.
pub const HEARTBEAT_COMMENT: &str = "ping";

/// One unit written to an open stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A record dispatch.
    Event { id: String, data: String },
    /// Keep-alive comment.
    Heartbeat,
}

impl Frame {
    /// Build the dispatch frame for a record.
    pub fn for_record<R: EventRecord>(record: &R) -> Result<Self> {
        let payload = record.frame_payload()?;
        Ok(Frame::Event {
            id: format_cursor(record.updated_at()),
            data: serde_json::to_string(&payload)?,
        })
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Frame::Heartbeat)
    }

    /// Event id (the resume cursor), if this is an event frame.
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Frame::Event { id, .. } => Some(id),
            Frame::Heartbeat => None,
        }
    }

    /// Render the frame exactly as it appears on the wire.
    pub fn encode(&self) -> String {
        match self {
            Frame::Event { id, data } => format!("id: {id}\ndata: {data}\n\n"),
            Frame::Heartbeat => format!(": {HEARTBEAT_COMMENT}\n\n"),
        }
    }
}

/// Render a timestamp as an event id.
pub fn format_cursor(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a client-supplied last event id. Anything unparseable is treated as
/// "no cursor", which replays everything still pending.
pub fn parse_cursor(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
