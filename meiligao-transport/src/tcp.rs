//! TCP stream implementation

use async_trait::async_trait;
use meiligao_core::MeiligaoResult;
use std::fmt;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::stream::DeviceStream;

/// One accepted tracker connection over TCP.
pub struct TcpDeviceStream {
    stream: TcpStream,
    peer: Option<SocketAddr>,
    closed: bool,
}

impl fmt::Debug for TcpDeviceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpDeviceStream")
            .field("peer", &self.peer)
            .field("closed", &self.closed)
            .finish()
    }
}

impl TcpDeviceStream {
    /// Wraps an already-accepted TCP stream.
    ///
    /// Disables Nagle's algorithm; a socket that rejects the option is
    /// used as-is.
    pub fn from_connected_stream(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        let _ = stream.set_nodelay(true);
        Self {
            stream,
            peer,
            closed: false,
        }
    }
}

#[async_trait]
impl DeviceStream for TcpDeviceStream {
    async fn read(&mut self, buf: &mut [u8]) -> MeiligaoResult<usize> {
        match self.stream.read(buf).await {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e.into())
            }
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> MeiligaoResult<()> {
        self.stream.write_all(buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> MeiligaoResult<()> {
        let _ = self.stream.shutdown().await;
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_round_trip_over_localhost() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"ping").await.unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).await.unwrap();
            buf
        });

        let (accepted, _) = listener.accept().await.unwrap();
        let mut stream = TcpDeviceStream::from_connected_stream(accepted);
        assert!(!stream.is_closed());
        assert!(stream.peer_addr().is_some());

        let mut buf = [0u8; 16];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ping");
        stream.write_all(b"pong").await.unwrap();
        assert_eq!(&client.await.unwrap(), b"pong");
    }

    #[tokio::test]
    async fn test_read_reports_peer_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (accepted, _) = listener.accept().await.unwrap();
        let mut stream = TcpDeviceStream::from_connected_stream(accepted);
        drop(client);

        let mut buf = [0u8; 16];
        assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
        assert!(stream.is_closed());
    }
}
