//! Transport layer for the Meiligao GPS tracker protocol
//!
//! Trackers connect outbound, so the server side only ever handles
//! already-accepted connections. This crate defines the stream contract a
//! session drives and its TCP implementation.

pub mod stream;
pub mod tcp;

pub use stream::DeviceStream;
pub use tcp::TcpDeviceStream;
