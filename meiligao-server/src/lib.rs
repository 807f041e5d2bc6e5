//! Meiligao tracker server: registry of live sessions plus the TCP accept
//! loop that feeds it.

pub mod listener;
pub mod server;

pub use server::{ServerConfig, ServerEvent, TrackerServer};
