//! Connection registry: which output streams are open for which user.
//!
//! Each open stream is a bounded channel of [`Frame`]s plus the heartbeat task
//! bound to it. The registry owns both; unregistering a connection drops its
//! sink and aborts its heartbeat, so nothing outlives the connection.
//!
//! All operations are synchronous and never hold the lock across an await.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{HubError, Result};
use crate::frame::Frame;

/// Sending half of a connection's frame channel.
pub type FrameSink = mpsc::Sender<Frame>;

/// Process-unique connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Cheap, cloneable reference to one open stream.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    user_id: Uuid,
    sink: FrameSink,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Non-blocking write. Fails when the peer is gone or its buffer is full;
    /// the caller is expected to tear the connection down.
    pub fn write(&self, frame: Frame) -> Result<()> {
        self.sink.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => HubError::transport(format!("{} buffer full", self.id)),
            TrySendError::Closed(_) => HubError::transport(format!("{} closed", self.id)),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_closed()
    }
}

struct ConnectionEntry {
    sink: FrameSink,
    heartbeat: Option<JoinHandle<()>>,
}

impl ConnectionEntry {
    fn close(self) {
        if let Some(heartbeat) = self.heartbeat {
            heartbeat.abort();
        }
    }
}

/// In-memory routing table from user id to that user's open streams.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<Uuid, HashMap<ConnectionId, ConnectionEntry>>>,
    next_id: AtomicU64,
    /// Set by `shutdown()`. Only written while `connections` is locked.
    closed: AtomicBool,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stream for `user_id`. Returns the handle used to write to it.
    ///
    /// After `shutdown()` the stream is not recorded: nothing will ever be
    /// published to it and it ends once the caller drops its handles.
    pub fn register(&self, user_id: Uuid, sink: FrameSink) -> ConnectionHandle {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = ConnectionHandle {
            id,
            user_id,
            sink: sink.clone(),
        };

        let open = {
            let mut connections = self.connections.lock();
            if self.closed.load(Ordering::Acquire) {
                debug!(user_id = %user_id, connection_id = %id, "Registry closed, stream not registered");
                return handle;
            }
            let user_conns = connections.entry(user_id).or_default();
            user_conns.insert(
                id,
                ConnectionEntry {
                    sink,
                    heartbeat: None,
                },
            );
            user_conns.len()
        };

        info!(user_id = %user_id, connection_id = %id, open, "Registered stream connection");
        handle
    }

    /// Remove a stream. The user's entry disappears with its last stream.
    /// Unregistering an unknown connection is a no-op; returns whether
    /// anything was removed.
    pub fn unregister(&self, handle: &ConnectionHandle) -> bool {
        self.remove(handle.user_id, handle.id)
    }

    /// Same as [`unregister`](Self::unregister), keyed by ids only.
    pub fn remove(&self, user_id: Uuid, id: ConnectionId) -> bool {
        let removed = {
            let mut connections = self.connections.lock();
            let Some(user_conns) = connections.get_mut(&user_id) else {
                return false;
            };
            let removed = user_conns.remove(&id);
            if user_conns.is_empty() {
                connections.remove(&user_id);
            }
            removed
        };

        match removed {
            Some(entry) => {
                entry.close();
                info!(user_id = %user_id, connection_id = %id, "Unregistered stream connection");
                true
            }
            None => false,
        }
    }

    /// Snapshot of the user's open streams. Safe to iterate while other
    /// connections register or close.
    pub fn streams_for(&self, user_id: Uuid) -> Vec<ConnectionHandle> {
        self.connections
            .lock()
            .get(&user_id)
            .map(|user_conns| {
                let mut handles: Vec<_> = user_conns
                    .iter()
                    .map(|(id, entry)| ConnectionHandle {
                        id: *id,
                        user_id,
                        sink: entry.sink.clone(),
                    })
                    .collect();
                handles.sort_by_key(|h| h.id);
                handles
            })
            .unwrap_or_default()
    }

    /// Bind a heartbeat task to a connection. If the connection is already
    /// gone the task is aborted immediately. A previously attached heartbeat
    /// is replaced and aborted.
    pub fn attach_heartbeat(&self, handle: &ConnectionHandle, heartbeat: JoinHandle<()>) {
        let mut connections = self.connections.lock();
        match connections
            .get_mut(&handle.user_id)
            .and_then(|user_conns| user_conns.get_mut(&handle.id))
        {
            Some(entry) => {
                if let Some(previous) = entry.heartbeat.replace(heartbeat) {
                    previous.abort();
                }
            }
            None => {
                debug!(connection_id = %handle.id, "Connection closed before heartbeat attached");
                heartbeat.abort();
            }
        }
    }

    /// Detach (without aborting) the heartbeat bound to a connection.
    pub fn detach_heartbeat(&self, handle: &ConnectionHandle) -> Option<JoinHandle<()>> {
        self.connections
            .lock()
            .get_mut(&handle.user_id)
            .and_then(|user_conns| user_conns.get_mut(&handle.id))
            .and_then(|entry| entry.heartbeat.take())
    }

    /// Close every connection: abort all heartbeats and drop all sinks,
    /// which ends every open stream. Returns how many were closed.
    ///
    /// The registry stays closed: later registrations are refused.
    pub fn shutdown(&self) -> usize {
        let drained = {
            let mut connections = self.connections.lock();
            self.closed.store(true, Ordering::Release);
            std::mem::take(&mut *connections)
        };
        let mut closed = 0;
        for (_, user_conns) in drained {
            for (_, entry) in user_conns {
                entry.close();
                closed += 1;
            }
        }
        if closed > 0 {
            info!(closed, "Closed all stream connections");
        }
        closed
    }

    /// Number of users with at least one open stream.
    pub fn connected_user_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Total number of open streams.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().values().map(HashMap::len).sum()
    }

    /// Number of open streams for one user.
    pub fn user_connection_count(&self, user_id: Uuid) -> usize {
        self.connections
            .lock()
            .get(&user_id)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    /// Whether `shutdown()` has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn channel() -> (FrameSink, mpsc::Receiver<Frame>) {
        mpsc::channel(8)
    }

    async fn settle(task: &tokio::task::AbortHandle) -> bool {
        for _ in 0..16 {
            if task.is_finished() {
                return true;
            }
            tokio::task::yield_now().await;
        }
        task.is_finished()
    }

    #[test]
    fn test_register_creates_user_entry() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::now_v7();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        let a = registry.register(user, tx1);
        let b = registry.register(user, tx2);

        assert_ne!(a.id(), b.id());
        assert_eq!(registry.connected_user_count(), 1);
        assert_eq!(registry.user_connection_count(user), 2);
        assert_eq!(registry.streams_for(user).len(), 2);
    }

    #[test]
    fn test_unregister_last_stream_removes_user() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::now_v7();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let a = registry.register(user, tx1);
        let b = registry.register(user, tx2);

        assert!(registry.unregister(&a));
        assert_eq!(registry.user_connection_count(user), 1);
        assert!(registry.unregister(&b));
        assert_eq!(registry.connected_user_count(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let handle = registry.register(Uuid::now_v7(), tx);

        assert!(registry.unregister(&handle));
        assert!(!registry.unregister(&handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_streams_for_unknown_user_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.streams_for(Uuid::now_v7()).is_empty());
    }

    #[test]
    fn test_streams_for_is_scoped_to_user() {
        let registry = ConnectionRegistry::new();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        registry.register(alice, tx1);
        registry.register(bob, tx2);

        let streams = registry.streams_for(alice);
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].user_id(), alice);
    }

    #[test]
    fn test_snapshot_survives_unregister() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::now_v7();
        let (tx, mut rx) = channel();
        let handle = registry.register(user, tx);

        let snapshot = registry.streams_for(user);
        registry.unregister(&handle);

        // The snapshot still holds a sink clone; iteration is unaffected.
        assert_eq!(snapshot.len(), 1);
        snapshot[0].write(Frame::Heartbeat).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Frame::Heartbeat);
    }

    #[test]
    fn test_write_fails_when_receiver_dropped() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = channel();
        let handle = registry.register(Uuid::now_v7(), tx);
        drop(rx);

        assert!(handle.is_closed());
        assert!(matches!(
            handle.write(Frame::Heartbeat),
            Err(HubError::TransportWrite(_))
        ));
    }

    #[test]
    fn test_write_fails_when_buffer_full() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let handle = registry.register(Uuid::now_v7(), tx);

        handle.write(Frame::Heartbeat).unwrap();
        let err = handle.write(Frame::Heartbeat).unwrap_err();
        assert!(err.to_string().contains("buffer full"));
    }

    #[tokio::test]
    async fn test_unregister_aborts_heartbeat() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let handle = registry.register(Uuid::now_v7(), tx);

        let heartbeat = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let abort = heartbeat.abort_handle();
        registry.attach_heartbeat(&handle, heartbeat);

        registry.unregister(&handle);
        assert!(settle(&abort).await);
    }

    #[tokio::test]
    async fn test_attach_to_closed_connection_aborts() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let handle = registry.register(Uuid::now_v7(), tx);
        registry.unregister(&handle);

        let heartbeat = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let abort = heartbeat.abort_handle();
        registry.attach_heartbeat(&handle, heartbeat);

        assert!(settle(&abort).await);
    }

    #[tokio::test]
    async fn test_detach_heartbeat_leaves_task_running() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let handle = registry.register(Uuid::now_v7(), tx);

        let heartbeat = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        registry.attach_heartbeat(&handle, heartbeat);

        let detached = registry.detach_heartbeat(&handle).unwrap();
        registry.unregister(&handle);
        tokio::task::yield_now().await;
        assert!(!detached.is_finished());
        detached.abort();
    }

    #[tokio::test]
    async fn test_shutdown_closes_everything() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        let a = registry.register(Uuid::now_v7(), tx1);
        registry.register(Uuid::now_v7(), tx2);

        let heartbeat = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let abort = heartbeat.abort_handle();
        registry.attach_heartbeat(&a, heartbeat);
        drop(a);

        assert_eq!(registry.shutdown(), 2);
        assert!(registry.is_empty());

        assert!(settle(&abort).await);
        // All sinks dropped: receivers observe end of stream.
        assert!(rx1.recv().await.is_none());
        assert!(rx2.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_register_after_shutdown_is_refused() {
        let registry = ConnectionRegistry::new();
        registry.shutdown();
        assert!(registry.is_closed());

        let user = Uuid::now_v7();
        let (tx, mut rx) = channel();
        let handle = registry.register(user, tx);
        assert_eq!(registry.connection_count(), 0);
        assert!(registry.streams_for(user).is_empty());

        // A late heartbeat is aborted right away instead of keeping the
        // stream alive.
        let heartbeat = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let abort = heartbeat.abort_handle();
        registry.attach_heartbeat(&handle, heartbeat);
        assert!(settle(&abort).await);

        drop(handle);
        assert!(rx.recv().await.is_none());
    }
}
