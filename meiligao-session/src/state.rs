//! Session lifecycle states

use std::fmt;

/// Lifecycle state of one tracker session.
///
/// Transitions:
/// ```text
/// NotLoggedIn -> Idle | Busy   (login confirmed)
/// Idle <-> Busy                (command dispatched / response resolved)
/// any -> Closed                (disconnect, terminal)
/// ```
///
/// A session with commands queued before the login frame arrives moves
/// straight from `NotLoggedIn` to `Busy`, never exposing an intermediate
/// `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStatus {
    /// Connected, login frame not yet received.
    NotLoggedIn,
    /// Logged in with no command awaiting a response.
    Idle,
    /// Logged in with one command on the wire.
    Busy,
    /// Session ended; no further transitions.
    Closed,
}

impl TrackerStatus {
    /// True once the login handshake has completed.
    pub fn is_logged_in(&self) -> bool {
        matches!(self, TrackerStatus::Idle | TrackerStatus::Busy)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TrackerStatus::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerStatus::NotLoggedIn => "NotLoggedIn",
            TrackerStatus::Idle => "Idle",
            TrackerStatus::Busy => "Busy",
            TrackerStatus::Closed => "Closed",
        }
    }
}

impl Default for TrackerStatus {
    fn default() -> Self {
        TrackerStatus::NotLoggedIn
    }
}

impl fmt::Display for TrackerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed the connection, a transport error ended it, or the
    /// close was requested locally.
    Closed,
    /// No inbound traffic within the idle timeout.
    Timeout,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Closed => "Closed",
            DisconnectReason::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
