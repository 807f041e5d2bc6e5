//! Device identifier
//!
//! Trackers identify themselves with a decimal numeral carried in every
//! frame. The wire field is seven bytes holding one decimal digit per
//! nibble, so an identifier never exceeds 14 digits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MeiligaoError, MeiligaoResult};

/// Decimal identifier of one tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(u64);

impl DeviceId {
    /// Upper bound implied by the 14-nibble wire field.
    pub const MAX_DIGITS: u32 = 14;

    /// Creates an identifier, rejecting values wider than the wire field.
    pub fn new(value: u64) -> MeiligaoResult<Self> {
        if value >= 10u64.pow(Self::MAX_DIGITS) {
            return Err(MeiligaoError::InvalidParameter(format!(
                "device id {value} exceeds {} digits",
                Self::MAX_DIGITS
            )));
        }
        Ok(DeviceId(value))
    }

    /// Numeric value of the identifier.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl FromStr for DeviceId {
    type Err = MeiligaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MeiligaoError::InvalidParameter(format!(
                "device id must be decimal digits, got {s:?}"
            )));
        }
        let value = s.parse::<u64>().map_err(|_| {
            MeiligaoError::InvalidParameter(format!("device id {s:?} out of range"))
        })?;
        DeviceId::new(value)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
