//! Per-connection session engine for Meiligao trackers: login handshake,
//! at-most-one-in-flight command queue, response correlation, unsolicited
//! report and alarm handling, idle timeout.

pub mod session;
pub mod state;

mod commands;
mod queue;

#[cfg(test)]
pub(crate) mod test_support;

pub use session::{DeviceMessage, Tracker, TrackerConfig, TrackerEvent};
pub use state::{DisconnectReason, TrackerStatus};
