//! Command code registry
//!
//! Every frame carries a 16-bit command code. Devices send `LOGIN`,
//! `REPORT` and `ALARM` plus the echoed results of server requests; the
//! server sends everything else.

use serde::{Deserialize, Serialize};

/// Known protocol command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    Login,
    ConfirmLogin,
    GetSnImei,
    RequestReport,
    ResetConfiguration,
    RebootGps,
    SetExtendedSettings,
    SetHeartbeatInterval,
    ClearMileage,
    SetPowerDownTimeout,
    GetMemoryReport,
    SetMemoryReportInterval,
    ClearMemoryReports,
    GetAuthorizedPhone,
    SetAuthorizedPhone,
    GetReportTimeInterval,
    SetReportTimeInterval,
    SetReportTimeIntervalResult,
    SetReportDistanceInterval,
    SetAlarmSpeeding,
    SetAlarmMovement,
    SetAlarmGeofence,
    Report,
    Alarm,
}

impl Command {
    /// Wire code of this command.
    pub const fn code(self) -> u16 {
        match self {
            Command::Login => 0x5000,
            Command::ConfirmLogin => 0x4000,
            Command::GetSnImei => 0x9001,
            Command::RequestReport => 0x4101,
            Command::ResetConfiguration => 0x4110,
            Command::RebootGps => 0x4902,
            Command::SetExtendedSettings => 0x4108,
            Command::SetHeartbeatInterval => 0x5199,
            Command::ClearMileage => 0x4351,
            Command::SetPowerDownTimeout => 0x4126,
            Command::GetMemoryReport => 0x9016,
            Command::SetMemoryReportInterval => 0x4131,
            Command::ClearMemoryReports => 0x5503,
            Command::GetAuthorizedPhone => 0x9003,
            Command::SetAuthorizedPhone => 0x4103,
            Command::GetReportTimeInterval => 0x9002,
            Command::SetReportTimeInterval => 0x4102,
            Command::SetReportTimeIntervalResult => 0x5100,
            Command::SetReportDistanceInterval => 0x4303,
            Command::SetAlarmSpeeding => 0x4105,
            Command::SetAlarmMovement => 0x4106,
            Command::SetAlarmGeofence => 0x4302,
            Command::Report => 0x9955,
            Command::Alarm => 0x9999,
        }
    }

    /// Looks up a known command by its wire code.
    pub fn from_code(code: u16) -> Option<Command> {
        let command = match code {
            0x5000 => Command::Login,
            0x4000 => Command::ConfirmLogin,
            0x9001 => Command::GetSnImei,
            0x4101 => Command::RequestReport,
            0x4110 => Command::ResetConfiguration,
            0x4902 => Command::RebootGps,
            0x4108 => Command::SetExtendedSettings,
            0x5199 => Command::SetHeartbeatInterval,
            0x4351 => Command::ClearMileage,
            0x4126 => Command::SetPowerDownTimeout,
            0x9016 => Command::GetMemoryReport,
            0x4131 => Command::SetMemoryReportInterval,
            0x5503 => Command::ClearMemoryReports,
            0x9003 => Command::GetAuthorizedPhone,
            0x4103 => Command::SetAuthorizedPhone,
            0x9002 => Command::GetReportTimeInterval,
            0x4102 => Command::SetReportTimeInterval,
            0x5100 => Command::SetReportTimeIntervalResult,
            0x4303 => Command::SetReportDistanceInterval,
            0x4105 => Command::SetAlarmSpeeding,
            0x4106 => Command::SetAlarmMovement,
            0x4302 => Command::SetAlarmGeofence,
            0x9955 => Command::Report,
            0x9999 => Command::Alarm,
            _ => return None,
        };
        Some(command)
    }

    /// Stable display name for diagnostics and packet logs.
    pub const fn name(self) -> &'static str {
        match self {
            Command::Login => "LOGIN",
            Command::ConfirmLogin => "CONFIRM_LOGIN",
            Command::GetSnImei => "GET_SN_IMEI",
            Command::RequestReport => "REQUEST_REPORT",
            Command::ResetConfiguration => "RESET_CONFIGURATION",
            Command::RebootGps => "REBOOT_GPS",
            Command::SetExtendedSettings => "SET_EXTENDED_SETTINGS",
            Command::SetHeartbeatInterval => "SET_HEARTBEAT_INTERVAL",
            Command::ClearMileage => "CLEAR_MILEAGE",
            Command::SetPowerDownTimeout => "SET_POWER_DOWN_TIMEOUT",
            Command::GetMemoryReport => "GET_MEMORY_REPORT",
            Command::SetMemoryReportInterval => "SET_MEMORY_REPORT_INTERVAL",
            Command::ClearMemoryReports => "CLEAR_MEMORY_REPORTS",
            Command::GetAuthorizedPhone => "GET_AUTHORIZED_PHONE",
            Command::SetAuthorizedPhone => "SET_AUTHORIZED_PHONE",
            Command::GetReportTimeInterval => "GET_REPORT_TIME_INTERVAL",
            Command::SetReportTimeInterval => "SET_REPORT_TIME_INTERVAL",
            Command::SetReportTimeIntervalResult => "SET_REPORT_TIME_INTERVAL_RESULT",
            Command::SetReportDistanceInterval => "SET_REPORT_DISTANCE_INTERVAL",
            Command::SetAlarmSpeeding => "SET_ALARM_SPEEDING",
            Command::SetAlarmMovement => "SET_ALARM_MOVEMENT",
            Command::SetAlarmGeofence => "SET_ALARM_GEOFENCE",
            Command::Report => "REPORT",
            Command::Alarm => "ALARM",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Command code a request's response arrives under.
///
/// Most devices echo the request code back with a result payload. The two
/// exceptions are position requests (answered with a generic report frame)
/// and report-interval changes (answered under a dedicated result code).
/// Unknown request codes resolve to themselves.
pub fn resolve_response(request: u16) -> u16 {
    match Command::from_code(request) {
        Some(Command::RequestReport) => Command::Report.code(),
        Some(Command::SetReportTimeInterval) => Command::SetReportTimeIntervalResult.code(),
        _ => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Command; 24] = [
        Command::Login,
        Command::ConfirmLogin,
        Command::GetSnImei,
        Command::RequestReport,
        Command::ResetConfiguration,
        Command::RebootGps,
        Command::SetExtendedSettings,
        Command::SetHeartbeatInterval,
        Command::ClearMileage,
        Command::SetPowerDownTimeout,
        Command::GetMemoryReport,
        Command::SetMemoryReportInterval,
        Command::ClearMemoryReports,
        Command::GetAuthorizedPhone,
        Command::SetAuthorizedPhone,
        Command::GetReportTimeInterval,
        Command::SetReportTimeInterval,
        Command::SetReportTimeIntervalResult,
        Command::SetReportDistanceInterval,
        Command::SetAlarmSpeeding,
        Command::SetAlarmMovement,
        Command::SetAlarmGeofence,
        Command::Report,
        Command::Alarm,
    ];

    #[test]
    fn test_code_lookup_round_trip() {
        for command in ALL {
            assert_eq!(Command::from_code(command.code()), Some(command));
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(Command::from_code(0x0000), None);
        assert_eq!(Command::from_code(0xabcd), None);
    }

    #[test]
    fn test_response_resolution() {
        assert_eq!(
            resolve_response(Command::RequestReport.code()),
            Command::Report.code()
        );
        assert_eq!(
            resolve_response(Command::SetReportTimeInterval.code()),
            Command::SetReportTimeIntervalResult.code()
        );
        assert_eq!(
            resolve_response(Command::RebootGps.code()),
            Command::RebootGps.code()
        );
        assert_eq!(resolve_response(0x1234), 0x1234);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(Command::Login.to_string(), "LOGIN");
        assert_eq!(Command::GetSnImei.name(), "GET_SN_IMEI");
    }
}
