//! Session registry
//!
//! Tracks every live session under a monotonically assigned id and
//! republishes connect/disconnect at the aggregate level. The registry
//! never interposes on per-session events; consumers read those from the
//! stream handed out in [`ServerEvent::Connected`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, mpsc};

use meiligao_core::DeviceId;
use meiligao_session::{DisconnectReason, Tracker, TrackerConfig, TrackerEvent};
use meiligao_transport::DeviceStream;

/// Server-wide settings.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Per-session tunables applied to every accepted connection.
    pub tracker: TrackerConfig,
}

/// Aggregate notification about the live session set.
#[derive(Debug)]
pub enum ServerEvent {
    /// A connection was attached. Carries the handle and the session's
    /// event stream.
    Connected(Tracker, mpsc::UnboundedReceiver<TrackerEvent>),
    /// A session left the live set.
    Disconnected {
        session_id: u64,
        reason: DisconnectReason,
    },
}

/// The live session set plus the aggregate event channel.
pub struct TrackerServer {
    config: ServerConfig,
    sessions: Arc<RwLock<HashMap<u64, Tracker>>>,
    next_session_id: AtomicU64,
    events: mpsc::UnboundedSender<ServerEvent>,
}

impl TrackerServer {
    /// Creates the registry and hands back the aggregate event stream.
    pub fn new(config: ServerConfig) -> (TrackerServer, mpsc::UnboundedReceiver<ServerEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let server = TrackerServer {
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_session_id: AtomicU64::new(0),
            events,
        };
        (server, event_rx)
    }

    /// Starts a session for an accepted connection.
    ///
    /// Inserts the handle into the live set, publishes
    /// [`ServerEvent::Connected`] and spawns a watcher that removes the
    /// session and publishes [`ServerEvent::Disconnected`] exactly once
    /// when it closes. Public so embedders can bring their own transport.
    pub async fn attach(&self, stream: Box<dyn DeviceStream>) -> Tracker {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tracker, events) = Tracker::spawn(session_id, stream, self.config.tracker.clone());
        self.sessions.write().await.insert(session_id, tracker.clone());
        let _ = self
            .events
            .send(ServerEvent::Connected(tracker.clone(), events));

        let sessions = Arc::clone(&self.sessions);
        let server_events = self.events.clone();
        let watched = tracker.clone();
        tokio::spawn(async move {
            let reason = watched.closed().await;
            if sessions.write().await.remove(&session_id).is_some() {
                let _ = server_events.send(ServerEvent::Disconnected { session_id, reason });
            }
        });
        tracker
    }

    /// Handle of a live session, if it is still connected.
    pub async fn session(&self, session_id: u64) -> Option<Tracker> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// Handles of every live session.
    pub async fn sessions(&self) -> Vec<Tracker> {
        self.sessions.read().await.values().cloned().collect()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Live session of the device that logged in with `device_id`.
    pub async fn find_device(&self, device_id: DeviceId) -> Option<Tracker> {
        self.sessions
            .read()
            .await
            .values()
            .find(|tracker| tracker.device_id() == Some(device_id))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meiligao_transport::TcpDeviceStream;
    use tokio::net::{TcpListener, TcpStream};

    #[tokio::test]
    async fn test_attach_tracks_sessions_until_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (server, mut events) = TrackerServer::new(ServerConfig::default());

        let client = TcpStream::connect(address).await.unwrap();
        let (accepted, _) = listener.accept().await.unwrap();
        let tracker = server
            .attach(Box::new(TcpDeviceStream::from_connected_stream(accepted)))
            .await;
        assert_eq!(tracker.session_id(), 1);
        assert_eq!(server.session_count().await, 1);
        assert!(server.session(1).await.is_some());

        match events.recv().await.unwrap() {
            ServerEvent::Connected(handle, _session_events) => {
                assert_eq!(handle.session_id(), tracker.session_id());
            }
            other => panic!("unexpected event: {other:?}"),
        }

        drop(client);
        match events.recv().await.unwrap() {
            ServerEvent::Disconnected { session_id, reason } => {
                assert_eq!(session_id, tracker.session_id());
                assert_eq!(reason, DisconnectReason::Closed);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(server.session_count().await, 0);
        assert!(server.session(1).await.is_none());
    }

    #[tokio::test]
    async fn test_session_ids_are_unique() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (server, _events) = TrackerServer::new(ServerConfig::default());

        let _first_client = TcpStream::connect(address).await.unwrap();
        let (first, _) = listener.accept().await.unwrap();
        let _second_client = TcpStream::connect(address).await.unwrap();
        let (second, _) = listener.accept().await.unwrap();

        let a = server
            .attach(Box::new(TcpDeviceStream::from_connected_stream(first)))
            .await;
        let b = server
            .attach(Box::new(TcpDeviceStream::from_connected_stream(second)))
            .await;
        assert_ne!(a.session_id(), b.session_id());
        assert_eq!(server.session_count().await, 2);
        assert_eq!(server.sessions().await.len(), 2);
    }
}
