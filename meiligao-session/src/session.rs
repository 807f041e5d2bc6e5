//! Session worker and its cloneable handle
//!
//! One worker task owns each connection: the stream, the frame splitter,
//! the command queue and the state machine all live on that task, so no
//! session field is ever shared mutably. Callers interact through the
//! [`Tracker`] handle, which submits operations over a channel and reads
//! state through a watch channel.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use meiligao_codec::payload::{decode_alarm, decode_position};
use meiligao_codec::{FrameItem, FrameSplitter, Message};
use meiligao_core::{
    AlarmKind, Command, DeviceId, MeiligaoError, MeiligaoResult, Position, ReportKind,
    resolve_response,
};
use meiligao_transport::DeviceStream;

use crate::queue::{CommandQueue, QueueEntry};
use crate::state::{DisconnectReason, TrackerStatus};

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Inbound silence budget. The session disconnects when no bytes
    /// arrive for this long; any read, heartbeats included, resets it.
    pub idle_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            idle_timeout: Duration::from_secs(120),
        }
    }
}

/// Decoded unsolicited message from a device.
#[derive(Debug, Clone)]
pub enum DeviceMessage {
    /// Position report, spontaneous or requested.
    Report {
        kind: ReportKind,
        position: Position,
        raw: Message,
    },
    /// Alarm with its embedded position.
    Alarm {
        kind: AlarmKind,
        position: Position,
        raw: Message,
    },
}

/// Everything one session tells its consumer.
#[derive(Debug)]
pub enum TrackerEvent {
    /// Login handshake confirmed.
    Login,
    /// Keep-alive byte received.
    Heartbeat,
    /// Decoded report or alarm.
    Message(DeviceMessage),
    /// Every frame that decoded, before any handling.
    PacketIn(Message),
    /// Every frame about to be written.
    PacketOut(Message),
    /// A frame that failed to decode. The session stays up.
    DecodeError { error: MeiligaoError, raw: Bytes },
    /// Terminal event; nothing follows it.
    Disconnect(DisconnectReason),
}

/// Operation submitted through a [`Tracker`] handle.
enum SessionOp {
    Request {
        message: Message,
        complete: oneshot::Sender<MeiligaoResult<Message>>,
    },
    Close,
}

/// Snapshot published on every observable transition.
#[derive(Debug, Clone, Copy, Default)]
struct SessionState {
    status: TrackerStatus,
    device_id: Option<DeviceId>,
    disconnect: Option<DisconnectReason>,
}

/// Cloneable handle to one connected tracker.
///
/// All methods may be called from any task; the session worker applies
/// submitted operations in order.
#[derive(Clone)]
pub struct Tracker {
    session_id: u64,
    peer_addr: Option<SocketAddr>,
    ops: mpsc::UnboundedSender<SessionOp>,
    state: watch::Receiver<SessionState>,
}

impl Tracker {
    /// Starts the worker task for an accepted connection.
    ///
    /// Returns the handle and the session's event stream. The stream ends
    /// with [`TrackerEvent::Disconnect`].
    pub fn spawn(
        session_id: u64,
        stream: Box<dyn DeviceStream>,
        config: TrackerConfig,
    ) -> (Tracker, mpsc::UnboundedReceiver<TrackerEvent>) {
        let peer_addr = stream.peer_addr();
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::default());
        let worker = SessionWorker {
            session_id,
            stream,
            config,
            splitter: FrameSplitter::new(),
            queue: CommandQueue::new(),
            state: SessionState::default(),
            state_tx,
            ops: ops_rx,
            ops_done: false,
            events: event_tx,
        };
        tokio::spawn(worker.run());
        let tracker = Tracker {
            session_id,
            peer_addr,
            ops: ops_tx,
            state: state_rx,
        };
        (tracker, event_rx)
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Device id learned from the first frame that carried one.
    pub fn device_id(&self) -> Option<DeviceId> {
        self.state.borrow().device_id
    }

    pub fn status(&self) -> TrackerStatus {
        self.state.borrow().status
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Waits until the session ends and reports why.
    pub async fn closed(&self) -> DisconnectReason {
        let mut state = self.state.clone();
        loop {
            if let Some(reason) = state.borrow_and_update().disconnect {
                return reason;
            }
            if state.changed().await.is_err() {
                return DisconnectReason::Closed;
            }
        }
    }

    /// Queues a raw frame and waits for the correlated response.
    ///
    /// Dispatch order equals call order and at most one command is on the
    /// wire at a time; before login the frame only queues. Fails with
    /// [`MeiligaoError::ConnectionClosed`] when the session ends first.
    pub async fn request(&self, message: Message) -> MeiligaoResult<Message> {
        let (tx, rx) = oneshot::channel();
        self.ops
            .send(SessionOp::Request {
                message,
                complete: tx,
            })
            .map_err(|_| MeiligaoError::ConnectionClosed)?;
        rx.await.map_err(|_| MeiligaoError::ConnectionClosed)?
    }

    /// Closes the connection and waits for the worker to finish.
    pub async fn close(&self) {
        if self.ops.send(SessionOp::Close).is_ok() {
            self.closed().await;
        }
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("session_id", &self.session_id)
            .field("peer_addr", &self.peer_addr)
            .field("status", &self.status())
            .finish()
    }
}

/// Outcome of one wait in the worker loop.
enum Step {
    Read(MeiligaoResult<usize>),
    Op(Option<SessionOp>),
    IdleTimeout,
}

struct SessionWorker {
    session_id: u64,
    stream: Box<dyn DeviceStream>,
    config: TrackerConfig,
    splitter: FrameSplitter,
    queue: CommandQueue,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    ops: mpsc::UnboundedReceiver<SessionOp>,
    ops_done: bool,
    events: mpsc::UnboundedSender<TrackerEvent>,
}

impl SessionWorker {
    async fn run(mut self) {
        match self.stream.peer_addr() {
            Some(peer) => log::info!("Session {} connected from {}", self.session_id, peer),
            None => log::info!("Session {} connected", self.session_id),
        }
        let reason = self.serve().await;
        self.shutdown(reason).await;
    }

    /// Drives the session until something ends it.
    async fn serve(&mut self) -> DisconnectReason {
        let mut buf = [0u8; 2048];
        let mut deadline = Instant::now() + self.config.idle_timeout;
        loop {
            let step = tokio::select! {
                result = self.stream.read(&mut buf) => Step::Read(result),
                op = self.ops.recv(), if !self.ops_done => Step::Op(op),
                _ = tokio::time::sleep_until(deadline) => Step::IdleTimeout,
            };
            match step {
                Step::Read(Ok(0)) => {
                    log::debug!("Session {} closed by peer", self.session_id);
                    return DisconnectReason::Closed;
                }
                Step::Read(Ok(n)) => {
                    deadline = Instant::now() + self.config.idle_timeout;
                    self.splitter.push(&buf[..n]);
                    while let Some(item) = self.splitter.next_item() {
                        if let Err(error) = self.handle_item(item).await {
                            log::warn!("Session {} write failed: {}", self.session_id, error);
                            return DisconnectReason::Closed;
                        }
                    }
                }
                Step::Read(Err(error)) => {
                    log::warn!("Session {} read failed: {}", self.session_id, error);
                    return DisconnectReason::Closed;
                }
                Step::Op(Some(SessionOp::Request { message, complete })) => {
                    if let Err(error) = self.submit(message, complete).await {
                        log::warn!("Session {} write failed: {}", self.session_id, error);
                        return DisconnectReason::Closed;
                    }
                }
                Step::Op(Some(SessionOp::Close)) => {
                    log::debug!("Session {} close requested", self.session_id);
                    return DisconnectReason::Closed;
                }
                Step::Op(None) => self.ops_done = true,
                Step::IdleTimeout => {
                    log::info!(
                        "Session {} idle for {:?}, disconnecting",
                        self.session_id,
                        self.config.idle_timeout
                    );
                    return DisconnectReason::Timeout;
                }
            }
        }
    }

    async fn handle_item(&mut self, item: FrameItem) -> MeiligaoResult<()> {
        match item {
            FrameItem::Heartbeat => {
                log::debug!("Session {} heartbeat", self.session_id);
                self.emit(TrackerEvent::Heartbeat);
                Ok(())
            }
            FrameItem::Frame(raw) => match Message::decode(&raw) {
                Ok(frame) => self.handle_frame(frame, &raw).await,
                Err(error) => {
                    log::warn!("Session {} undecodable frame: {}", self.session_id, error);
                    self.emit(TrackerEvent::DecodeError { error, raw });
                    Ok(())
                }
            },
        }
    }

    /// Applies one decoded frame.
    ///
    /// Login, queue resolution and the report/alarm classifications are
    /// independent checks: a report frame answering a position request
    /// both resolves the command and reaches the event stream.
    async fn handle_frame(&mut self, frame: Message, raw: &Bytes) -> MeiligaoResult<()> {
        self.emit(TrackerEvent::PacketIn(frame.clone()));
        if self.state.device_id.is_none() {
            if let Some(id) = frame.device_id {
                log::debug!("Session {} is device {}", self.session_id, id);
                self.state.device_id = Some(id);
                self.publish();
            }
        }
        if frame.command == Command::Login.code() {
            self.confirm_login().await?;
        }
        if self.queue.expected() == Some(frame.command) {
            self.queue.resolve(frame.clone());
            self.set_status(TrackerStatus::Idle);
            self.pump().await?;
        }
        // The kind registry is keyed by message-type code; spontaneous
        // reports always arrive under the generic report command, which
        // classifies as ByTime. The other kinds are not command codes.
        if let Some(kind) = ReportKind::from_code(frame.command) {
            match decode_position(&frame.payload) {
                Ok(position) => self.emit(TrackerEvent::Message(DeviceMessage::Report {
                    kind,
                    position,
                    raw: frame.clone(),
                })),
                Err(error) => {
                    log::warn!("Session {} bad report payload: {}", self.session_id, error);
                    self.emit(TrackerEvent::DecodeError {
                        error,
                        raw: raw.clone(),
                    });
                }
            }
        }
        if frame.command == Command::Alarm.code() {
            match decode_alarm(&frame.payload) {
                Ok((kind, position)) => {
                    log::info!("Session {} alarm: {}", self.session_id, kind);
                    self.emit(TrackerEvent::Message(DeviceMessage::Alarm {
                        kind,
                        position,
                        raw: frame.clone(),
                    }));
                }
                Err(error) => {
                    log::warn!("Session {} bad alarm payload: {}", self.session_id, error);
                    self.emit(TrackerEvent::DecodeError {
                        error,
                        raw: raw.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Answers a login frame and releases anything queued before it.
    async fn confirm_login(&mut self) -> MeiligaoResult<()> {
        let reply = Message::request_raw(Command::ConfirmLogin, Bytes::from_static(&[0x01]));
        self.send_frame(reply).await?;
        self.emit(TrackerEvent::Login);
        if self.state.status == TrackerStatus::NotLoggedIn {
            match self.state.device_id {
                Some(id) => log::info!("Session {} login as {}", self.session_id, id),
                None => log::info!("Session {} login without a device id", self.session_id),
            }
            if !self.pump().await? {
                self.set_status(TrackerStatus::Idle);
            }
        }
        Ok(())
    }

    async fn submit(
        &mut self,
        message: Message,
        complete: oneshot::Sender<MeiligaoResult<Message>>,
    ) -> MeiligaoResult<()> {
        self.queue.push(QueueEntry {
            expected_response: resolve_response(message.command),
            message,
            complete,
        });
        if self.state.status == TrackerStatus::Idle {
            self.pump().await?;
        }
        Ok(())
    }

    /// Dispatches the next queued command when none is in flight.
    ///
    /// Returns whether a command went out; the session is `Busy` exactly
    /// when one did.
    async fn pump(&mut self) -> MeiligaoResult<bool> {
        let frame = match self.queue.promote() {
            Some(entry) => entry.message.clone(),
            None => return Ok(false),
        };
        log::debug!("Session {} dispatching {}", self.session_id, frame);
        self.send_frame(frame).await?;
        self.set_status(TrackerStatus::Busy);
        Ok(true)
    }

    /// Stamps the learned device id onto the frame and writes it.
    async fn send_frame(&mut self, mut frame: Message) -> MeiligaoResult<()> {
        if frame.device_id.is_none() {
            frame.device_id = self.state.device_id;
        }
        self.emit(TrackerEvent::PacketOut(frame.clone()));
        let bytes = frame.encode();
        self.stream.write_all(&bytes).await
    }

    async fn shutdown(mut self, reason: DisconnectReason) {
        let pending = self.queue.len();
        if pending > 0 {
            log::debug!(
                "Session {} failing {} pending command(s)",
                self.session_id,
                pending
            );
        }
        self.queue.fail_all(|| MeiligaoError::ConnectionClosed);
        self.state.disconnect = Some(reason);
        self.set_status(TrackerStatus::Closed);
        let _ = self.stream.close().await;
        self.emit(TrackerEvent::Disconnect(reason));
        log::info!("Session {} disconnected: {}", self.session_id, reason);
    }

    fn set_status(&mut self, status: TrackerStatus) {
        if self.state.status == status {
            return;
        }
        log::debug!(
            "Session {} state {} -> {}",
            self.session_id,
            self.state.status,
            status
        );
        self.state.status = status;
        self.publish();
    }

    fn publish(&self) {
        let _ = self.state_tx.send(self.state);
    }

    fn emit(&self, event: TrackerEvent) {
        let _ = self.events.send(event);
    }
}
