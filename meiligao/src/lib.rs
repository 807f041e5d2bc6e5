//! Server-side implementation of the Meiligao GPS tracker protocol
//!
//! Meiligao-family devices (VT300/VT310/GT60 class) connect outbound over
//! TCP, log in with their device id, stream position reports and alarms,
//! and accept one server command at a time. This library implements the
//! wire codec and the per-connection session engine for that dialog.
//!
//! # Architecture
//!
//! The library is organized as a workspace with multiple crates:
//!
//! - `meiligao-core`: Command registry, device id, typed data model, errors
//! - `meiligao-codec`: Frame encode/decode, CRC16/CCITT, frame splitter,
//!   per-command payload decoders
//! - `meiligao-transport`: `DeviceStream` transport contract plus the TCP
//!   implementation
//! - `meiligao-session`: Session worker, command queue, `Tracker` handle
//!   with the typed command surface
//! - `meiligao-server`: Live-session registry and the TCP accept loop
//!
//! # Usage
//!
//! ```no_run
//! use meiligao::server::{ServerConfig, TrackerServer};
//!
//! async fn run() -> meiligao::MeiligaoResult<()> {
//!     let (server, _events) = TrackerServer::new(ServerConfig::default());
//!     server.listen("0.0.0.0:7700".parse().unwrap()).await
//! }
//! ```
//!
//! Consumers read per-session events (logins, reports, alarms, packet
//! traces) from the stream carried by each
//! [`ServerEvent::Connected`](server::ServerEvent::Connected) and issue
//! commands through the [`Tracker`](session::Tracker) handle it wraps.

// Re-export core types
pub use meiligao_core::{
    AlarmKind, AuthorizedPhones, Command, DeviceId, Direction, ExtendedSettings, MeiligaoError,
    MeiligaoResult, Position, ReportKind, SnImei, resolve_response,
};

// Re-export the codec
pub mod codec {
    pub use meiligao_codec::*;
}

// Re-export the transport contract
pub mod transport {
    pub use meiligao_transport::*;
}

// Re-export the session API
pub mod session {
    pub use meiligao_session::*;
}

// Re-export the server API
pub mod server {
    pub use meiligao_server::*;
}
