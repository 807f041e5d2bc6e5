//! TCP accept loop
//!
//! Convenience layer over [`TrackerServer::attach`]: binds a listener and
//! wraps every accepted connection in a [`TcpDeviceStream`]. Embedders
//! with their own transport call `attach` directly.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use meiligao_core::MeiligaoResult;
use meiligao_transport::TcpDeviceStream;

use crate::server::TrackerServer;

impl TrackerServer {
    /// Binds `address` and accepts device connections until the future is
    /// dropped.
    pub async fn listen(&self, address: SocketAddr) -> MeiligaoResult<()> {
        let listener = TcpListener::bind(address).await?;
        self.serve(listener).await
    }

    /// Accept loop over an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> MeiligaoResult<()> {
        if let Ok(address) = listener.local_addr() {
            log::info!("Tracker server listening on {}", address);
        }
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    log::info!("Accepted connection from {}", peer_addr);
                    self.attach(Box::new(TcpDeviceStream::from_connected_stream(stream)))
                        .await;
                }
                Err(error) => {
                    log::warn!("Failed to accept a connection: {}", error);
                }
            }
        }
    }
}
