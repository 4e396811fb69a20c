// SSE response plumbing shared by the task and notification streams
//
// A Subscription already yields replay frames followed by live frames and
// heartbeats; this module only maps them onto axum's SSE encoder.

use axum::{
    http::{header::HeaderName, HeaderMap, HeaderValue},
    response::{
        sse::{Event as SseEvent, Sse},
        IntoResponse, Response,
    },
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Deserialize;
use std::convert::Infallible;
use studio_core::{frame::HEARTBEAT_COMMENT, parse_cursor, Frame, Subscription};
use utoipa::IntoParams;

/// Header carrying the id of the last event a reconnecting client saw.
pub const LAST_EVENT_ID: &str = "last-event-id";

/// Query parameters accepted by stream endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StreamQuery {
    /// Resume cursor for clients that cannot set `Last-Event-ID`
    /// (e.g. a browser EventSource opened for the first time).
    pub last_event_id: Option<String>,
}

/// Resume cursor of a stream request: `Last-Event-ID` first, then the
/// `last_event_id` query parameter. Unparseable values count as absent.
pub fn resume_cursor(headers: &HeaderMap, query: &StreamQuery) -> Option<DateTime<Utc>> {
    headers
        .get(LAST_EVENT_ID)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_cursor)
        .or_else(|| query.last_event_id.as_deref().and_then(parse_cursor))
}

fn to_sse_event(frame: Frame) -> SseEvent {
    match frame {
        Frame::Event { id, data } => SseEvent::default().id(id).data(data),
        Frame::Heartbeat => SseEvent::default().comment(HEARTBEAT_COMMENT),
    }
}

/// Turn a subscription into a `text/event-stream` response.
///
/// Heartbeats come from the hub, so axum's own keep-alive stays off.
pub fn stream_response(subscription: Subscription) -> Response {
    let stream = subscription.map(|frame| Ok::<_, Infallible>(to_sse_event(frame)));

    (
        [(
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        )],
        Sse::new(stream),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_cursor_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LAST_EVENT_ID,
            HeaderValue::from_static("2025-03-01T12:30:00.000001Z"),
        );
        let query = StreamQuery {
            last_event_id: Some("2024-01-01T00:00:00.000000Z".to_string()),
        };

        let cursor = resume_cursor(&headers, &query).unwrap();
        assert_eq!(cursor.to_rfc3339(), "2025-03-01T12:30:00.000001+00:00");
    }

    #[test]
    fn test_resume_cursor_falls_back_to_query() {
        let query = StreamQuery {
            last_event_id: Some("2024-01-01T00:00:00.000000Z".to_string()),
        };
        assert!(resume_cursor(&HeaderMap::new(), &query).is_some());
    }

    #[test]
    fn test_invalid_resume_cursor_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(LAST_EVENT_ID, HeaderValue::from_static("not-a-date"));
        assert!(resume_cursor(&headers, &StreamQuery::default()).is_none());
        assert!(resume_cursor(&HeaderMap::new(), &StreamQuery::default()).is_none());
    }
}
