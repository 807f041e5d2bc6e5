//! Decoded data model
//!
//! Plain data produced by the payload decoders: GPS fixes, device identity
//! strings, phone configuration, and the extended-settings flag block.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frame direction, selected by the two-byte ASCII prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Device to server, prefix `$$`.
    FromDevice,
    /// Server to device, prefix `@@`.
    ToDevice,
}

impl Direction {
    /// The two-byte prefix marker for this direction.
    pub const fn marker(self) -> [u8; 2] {
        match self {
            Direction::FromDevice => *b"$$",
            Direction::ToDevice => *b"@@",
        }
    }

    /// Classifies a prefix marker.
    pub fn from_marker(marker: [u8; 2]) -> Option<Direction> {
        match &marker {
            b"$$" => Some(Direction::FromDevice),
            b"@@" => Some(Direction::ToDevice),
            _ => None,
        }
    }
}

/// Why a device produced a position report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    PowerOn,
    ByTime,
    ByDistance,
    BlindAreaStart,
    BlindAreaEnd,
    DirectionChange,
}

impl ReportKind {
    pub const fn code(self) -> u16 {
        match self {
            ReportKind::PowerOn => 0x14,
            ReportKind::ByTime => 0x9955,
            ReportKind::ByDistance => 0x63,
            ReportKind::BlindAreaStart => 0x15,
            ReportKind::BlindAreaEnd => 0x16,
            ReportKind::DirectionChange => 0x52,
        }
    }

    pub fn from_code(code: u16) -> Option<ReportKind> {
        let kind = match code {
            0x14 => ReportKind::PowerOn,
            0x9955 => ReportKind::ByTime,
            0x63 => ReportKind::ByDistance,
            0x15 => ReportKind::BlindAreaStart,
            0x16 => ReportKind::BlindAreaEnd,
            0x52 => ReportKind::DirectionChange,
            _ => return None,
        };
        Some(kind)
    }

    pub const fn name(self) -> &'static str {
        match self {
            ReportKind::PowerOn => "REPORT_POWER_ON",
            ReportKind::ByTime => "REPORT_BY_TIME",
            ReportKind::ByDistance => "REPORT_BY_DISTANCE",
            ReportKind::BlindAreaStart => "REPORT_BLIND_AREA_START",
            ReportKind::BlindAreaEnd => "REPORT_BLIND_AREA_END",
            ReportKind::DirectionChange => "REPORT_DIRECTION_CHANGE",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Alarm classifier carried as the first payload byte of an alarm frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmKind {
    SosPressed,
    SosReleased,
    LowBattery,
    Speeding,
    /// Movement and geofence violations share one code.
    Movement,
    /// A code this registry does not know, carried through verbatim.
    Other(u8),
}

impl AlarmKind {
    pub fn from_code(code: u8) -> AlarmKind {
        match code {
            0x01 => AlarmKind::SosPressed,
            0x31 => AlarmKind::SosReleased,
            0x10 => AlarmKind::LowBattery,
            0x11 => AlarmKind::Speeding,
            0x12 => AlarmKind::Movement,
            other => AlarmKind::Other(other),
        }
    }

    pub const fn code(self) -> u8 {
        match self {
            AlarmKind::SosPressed => 0x01,
            AlarmKind::SosReleased => 0x31,
            AlarmKind::LowBattery => 0x10,
            AlarmKind::Speeding => 0x11,
            AlarmKind::Movement => 0x12,
            AlarmKind::Other(code) => code,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            AlarmKind::SosPressed => "ALARM_SOS_PRESSED",
            AlarmKind::SosReleased => "ALARM_SOS_RELEASED",
            AlarmKind::LowBattery => "ALARM_LOW_BATTERY",
            AlarmKind::Speeding => "ALARM_SPEEDING",
            AlarmKind::Movement => "ALARM_MOVEMENT",
            AlarmKind::Other(_) => "ALARM_UNKNOWN",
        }
    }
}

impl std::fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded GPS fix with its telemetry tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Fix time in UTC, combined from the payload's time and date fields.
    pub timestamp: DateTime<Utc>,
    /// GPS validity flag, `A` on the wire.
    pub valid: bool,
    /// Decimal degrees, southern hemisphere negative.
    pub latitude: f64,
    /// Decimal degrees, western hemisphere negative.
    pub longitude: f64,
    pub speed_knots: f64,
    pub heading: f64,
    pub altitude: f64,
    /// Digital input/output state as transmitted.
    pub io_status: String,
    pub analog_inputs: Vec<String>,
    pub base_station: String,
    /// GSM signal quality (CSQ).
    pub signal_quality: u8,
    /// Accumulated odometer value in meters.
    pub odometer: u32,
}

/// Serial number and IMEI pair returned by the identity query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnImei {
    pub sn: String,
    pub imei: String,
}

/// Authorized phone numbers for SMS commands and position calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedPhones {
    pub sms: String,
    pub call: String,
}

/// Extended device behavior switches (command `SET_EXTENDED_SETTINGS`).
///
/// Transmitted as seven `0`/`1` ASCII digits in field order followed by two
/// reserved `0` digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedSettings {
    /// Reply to a voice call with a position SMS.
    pub sms_position_on_call: bool,
    /// Turn the status LEDs off while running.
    pub hide_indicator_led: bool,
    /// Send a report when the device powers on.
    pub power_on_report: bool,
    /// Report entering and leaving GSM blind areas.
    pub blind_area_report: bool,
    /// Report heading changes beyond the device threshold.
    pub direction_change_report: bool,
    pub low_battery_alarm: bool,
    pub sos_alarm: bool,
}

impl ExtendedSettings {
    /// Renders the nine-digit flag block the device expects.
    pub fn to_digits(self) -> String {
        let flags = [
            self.sms_position_on_call,
            self.hide_indicator_led,
            self.power_on_report,
            self.blind_area_report,
            self.direction_change_report,
            self.low_battery_alarm,
            self.sos_alarm,
        ];
        let mut digits: String = flags
            .iter()
            .map(|&flag| if flag { '1' } else { '0' })
            .collect();
        digits.push_str("00");
        digits
    }
}

impl Default for ExtendedSettings {
    fn default() -> Self {
        ExtendedSettings {
            sms_position_on_call: true,
            hide_indicator_led: false,
            power_on_report: true,
            blind_area_report: false,
            direction_change_report: false,
            low_battery_alarm: true,
            sos_alarm: true,
        }
    }
}
