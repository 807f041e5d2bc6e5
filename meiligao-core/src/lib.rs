//! Core types and utilities for the Meiligao GPS tracker protocol
//!
//! This crate provides the command registry, device identifiers, the
//! decoded data model, and error handling used throughout the
//! implementation.

pub mod command;
pub mod device_id;
pub mod error;
pub mod types;

pub use command::{Command, resolve_response};
pub use device_id::DeviceId;
pub use error::{MeiligaoError, MeiligaoResult};
pub use types::{
    AlarmKind, AuthorizedPhones, Direction, ExtendedSettings, Position, ReportKind, SnImei,
};
