//! Event stream hub: subscription bootstrap, replay and live fan-out.
//!
//! One hub instance serves one record kind. Connecting registers a stream,
//! starts its heartbeat and replays what the client missed; publishing writes
//! a frame to every open stream of the record's owner. Records that find no
//! open stream stay undelivered in the store and are picked up by the next
//! connect's replay.
//!
//! Delivery is at-least-once: a record updated while a connect is replaying
//! may reach the client twice. Clients de-duplicate by record id.

use chrono::{DateTime, Utc};
use futures::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{HubError, Result};
use crate::frame::Frame;
use crate::record::{EventRecord, RecordSource};
use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};

/// Interval between heartbeat comments on an idle stream.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Frames buffered per connection before the peer counts as too slow.
pub const DEFAULT_CONNECTION_BUFFER: usize = 256;

/// Tuning knobs for a hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub heartbeat_interval: Duration,
    pub connection_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
        }
    }
}

impl HubConfig {
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_connection_buffer(mut self, buffer: usize) -> Self {
        self.connection_buffer = buffer.max(1);
        self
    }
}

/// Generic hub over one record kind.
pub struct EventStreamHub<S: RecordSource> {
    source: Arc<S>,
    registry: Arc<ConnectionRegistry>,
    config: HubConfig,
}

impl<S: RecordSource> EventStreamHub<S> {
    pub fn new(source: Arc<S>, config: HubConfig) -> Self {
        Self {
            source,
            registry: Arc::new(ConnectionRegistry::new()),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Open a subscription for `user_id`.
    ///
    /// Replayed records (oldest first) are queued ahead of any live frame.
    /// Undelivered records are marked delivered once their frame is queued.
    /// A store failure aborts the connect; the half-open connection is torn
    /// down when the subscription is dropped on the error path. After
    /// `shutdown()` every connect fails with `ShuttingDown`.
    pub async fn connect(
        &self,
        user_id: Uuid,
        resume_after: Option<DateTime<Utc>>,
    ) -> Result<Subscription> {
        if self.registry.is_closed() {
            return Err(HubError::ShuttingDown);
        }

        let (tx, rx) = mpsc::channel(self.config.connection_buffer);
        let handle = self.registry.register(user_id, tx);

        let mut subscription = Subscription {
            id: handle.id(),
            user_id,
            registry: Arc::clone(&self.registry),
            replay: VecDeque::new(),
            rx,
        };

        let heartbeat = self.spawn_heartbeat(handle.clone());
        self.registry.attach_heartbeat(&handle, heartbeat);

        let records = self.source.fetch_for_replay(user_id, resume_after).await?;
        let replayed = records.len();

        for record in records {
            subscription.replay.push_back(Frame::for_record(&record)?);
            if record.is_undelivered() {
                self.source.mark_delivered(&record).await?;
            }
        }

        info!(
            user_id = %user_id,
            connection_id = %handle.id(),
            kind = S::Record::KIND,
            replayed,
            resumed = resume_after.is_some(),
            "Stream connected"
        );

        Ok(subscription)
    }

    /// Fan a persisted record out to every open stream of its owner.
    ///
    /// A failed write tears down that one stream and never affects the
    /// others or the caller. With no open stream the record is left as is
    /// for replay. Returns the record as it is now stored: marked delivered
    /// when at least one write succeeded and the record was undelivered.
    pub async fn publish(&self, record: S::Record) -> Result<S::Record> {
        let owner_id = record.owner_id();
        let streams = self.registry.streams_for(owner_id);

        if streams.is_empty() {
            debug!(
                user_id = %owner_id,
                record_id = %record.id(),
                kind = S::Record::KIND,
                "No open stream, record left for replay"
            );
            return Ok(record);
        }

        let frame = Frame::for_record(&record)?;
        let delivered = self.fan_out(&streams, &frame);

        debug!(
            user_id = %owner_id,
            record_id = %record.id(),
            kind = S::Record::KIND,
            delivered,
            streams = streams.len(),
            "Record dispatched"
        );

        if delivered > 0 && record.is_undelivered() {
            if let Some(updated) = self.source.mark_delivered(&record).await? {
                return Ok(updated);
            }
        }

        Ok(record)
    }

    /// Close every stream and cancel every heartbeat.
    pub fn shutdown(&self) -> usize {
        self.registry.shutdown()
    }

    fn fan_out(&self, streams: &[ConnectionHandle], frame: &Frame) -> usize {
        let mut delivered = 0;
        for handle in streams {
            match handle.write(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        user_id = %handle.user_id(),
                        connection_id = %handle.id(),
                        error = %e,
                        "Dropping stream after failed write"
                    );
                    self.registry.unregister(handle);
                }
            }
        }
        delivered
    }

    fn spawn_heartbeat(&self, handle: ConnectionHandle) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let period = self.config.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = handle.write(Frame::Heartbeat) {
                    debug!(
                        user_id = %handle.user_id(),
                        connection_id = %handle.id(),
                        error = %e,
                        "Heartbeat failed, closing stream"
                    );
                    registry.unregister(&handle);
                    break;
                }
            }
        })
    }
}

/// An open stream as seen by the transport: replay frames first, then live
/// frames in the order they were published. Dropping it is the disconnect.
///
/// Holds no sink of its own, so the stream ends once the registry lets go of
/// the connection.
pub struct Subscription {
    id: ConnectionId,
    user_id: Uuid,
    registry: Arc<ConnectionRegistry>,
    replay: VecDeque<Frame>,
    rx: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Frames queued by replay and not yet consumed.
    pub fn pending_replay(&self) -> usize {
        self.replay.len()
    }
}

impl Stream for Subscription {
    type Item = Frame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        let this = self.get_mut();
        if let Some(frame) = this.replay.pop_front() {
            return Poll::Ready(Some(frame));
        }
        this.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.registry.remove(self.user_id, self.id) {
            debug!(
                user_id = %self.user_id,
                connection_id = %self.id,
                "Stream closed by peer"
            );
        }
    }
}
