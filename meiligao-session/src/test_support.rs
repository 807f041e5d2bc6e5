//! Scripted in-memory stream for session dialog tests.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use meiligao_codec::Message;
use meiligao_core::{Command, DeviceId, Direction, MeiligaoResult};
use meiligao_transport::DeviceStream;

use crate::session::{Tracker, TrackerConfig, TrackerEvent};

/// Device id used by every scripted dialog.
pub const DEVICE: &str = "13512345678";

/// Position payload from a real VT300 capture.
pub const POSITION_TEXT: &str =
    "061522,A,5545.2343,N,03737.2523,E,000.0,000.0,170324*|000|110000|0,0,0,0|1234|22|00125";

/// In-memory `DeviceStream` fed and observed through channels.
pub struct ChannelStream {
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    pending: Vec<u8>,
    closed: bool,
}

/// Test-side controls for a [`ChannelStream`].
///
/// Dropping the harness closes both directions, which the session observes
/// as a peer disconnect.
pub struct StreamHarness {
    pub feed: mpsc::UnboundedSender<Vec<u8>>,
    pub wire: mpsc::UnboundedReceiver<Vec<u8>>,
}

pub fn channel_stream() -> (ChannelStream, StreamHarness) {
    let (feed_tx, feed_rx) = mpsc::unbounded_channel();
    let (wire_tx, wire_rx) = mpsc::unbounded_channel();
    (
        ChannelStream {
            inbound: feed_rx,
            outbound: wire_tx,
            pending: Vec::new(),
            closed: false,
        },
        StreamHarness {
            feed: feed_tx,
            wire: wire_rx,
        },
    )
}

#[async_trait]
impl DeviceStream for ChannelStream {
    async fn read(&mut self, buf: &mut [u8]) -> MeiligaoResult<usize> {
        while self.pending.is_empty() {
            match self.inbound.recv().await {
                Some(chunk) => self.pending = chunk,
                None => {
                    self.closed = true;
                    return Ok(0);
                }
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    async fn write_all(&mut self, buf: &[u8]) -> MeiligaoResult<()> {
        let _ = self.outbound.send(buf.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> MeiligaoResult<()> {
        self.closed = true;
        self.inbound.close();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

pub fn spawn_session(
    config: TrackerConfig,
) -> (
    Tracker,
    mpsc::UnboundedReceiver<TrackerEvent>,
    StreamHarness,
) {
    let (stream, harness) = channel_stream();
    let (tracker, events) = Tracker::spawn(1, Box::new(stream), config);
    (tracker, events, harness)
}

/// Encodes one device-to-server frame carrying [`DEVICE`].
pub fn device_frame(command: u16, payload: &[u8]) -> Vec<u8> {
    let id: DeviceId = DEVICE.parse().unwrap();
    Message::new(Direction::FromDevice, command, payload.to_vec())
        .with_device_id(id)
        .encode()
        .to_vec()
}

pub fn login_frame() -> Vec<u8> {
    device_frame(Command::Login.code(), b"")
}

pub fn ack_frame(command: u16) -> Vec<u8> {
    device_frame(command, &[0x01])
}

/// Next frame the session wrote, decoded.
pub async fn next_wire_frame(harness: &mut StreamHarness) -> Message {
    let bytes = tokio::time::timeout(Duration::from_secs(2), harness.wire.recv())
        .await
        .expect("no frame written in time")
        .expect("wire closed");
    Message::decode(&bytes).expect("session wrote an undecodable frame")
}

/// Next event that is not packet tracing.
pub async fn next_protocol_event(
    events: &mut mpsc::UnboundedReceiver<TrackerEvent>,
) -> TrackerEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("no event in time")
            .expect("event stream closed");
        match event {
            TrackerEvent::PacketIn(_) | TrackerEvent::PacketOut(_) => continue,
            other => return other,
        }
    }
}
