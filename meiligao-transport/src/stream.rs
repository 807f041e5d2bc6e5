//! Stream contract between a session and its connection

use async_trait::async_trait;
use meiligao_core::MeiligaoResult;
use std::net::SocketAddr;

/// Byte stream of one accepted tracker connection.
///
/// A session owns its stream exclusively and serializes every read and
/// write on one task, so implementations never see concurrent calls.
/// `read` must be cancellation safe: the session races it against its
/// operation channel and idle timer, and a cancelled read must not consume
/// bytes.
#[async_trait]
pub trait DeviceStream: Send {
    /// Read available bytes into `buf`.
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 once the peer has closed.
    async fn read(&mut self, buf: &mut [u8]) -> MeiligaoResult<usize>;

    /// Write the whole buffer to the peer.
    async fn write_all(&mut self, buf: &[u8]) -> MeiligaoResult<()>;

    /// Close the stream; subsequent reads return 0.
    async fn close(&mut self) -> MeiligaoResult<()>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Peer address, when the transport has one.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}
