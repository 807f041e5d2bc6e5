//! Typed command surface on the session handle
//!
//! Each method validates its parameters, encodes the request payload the
//! way the device expects, and decodes the correlated response. Parameter
//! violations fail with [`MeiligaoError::InvalidParameter`] before anything
//! is sent.

use rand::Rng;

use meiligao_codec::payload;
use meiligao_codec::{CommandData, MemoryPage, Message};
use meiligao_core::{
    AuthorizedPhones, Command, ExtendedSettings, MeiligaoError, MeiligaoResult, Position, SnImei,
};

use crate::session::Tracker;

impl Tracker {
    /// Asks the device for its current position.
    pub async fn request_report(&self) -> MeiligaoResult<Position> {
        let response = self.request(Message::request(Command::RequestReport)).await?;
        match payload::decode_result(response.command, &response.payload)? {
            CommandData::Position(position) => Ok(position),
            _ => Err(unexpected(&response)),
        }
    }

    /// Reads the device serial number and IMEI.
    pub async fn get_sn_imei(&self) -> MeiligaoResult<SnImei> {
        let response = self.request(Message::request(Command::GetSnImei)).await?;
        match payload::decode_result(response.command, &response.payload)? {
            CommandData::SnImei(identity) => Ok(identity),
            _ => Err(unexpected(&response)),
        }
    }

    /// Restores the factory configuration.
    pub async fn reset_configuration(&self) -> MeiligaoResult<bool> {
        self.acknowledged(Message::request(Command::ResetConfiguration))
            .await
    }

    /// Restarts the GPS module.
    pub async fn reboot_gps(&self) -> MeiligaoResult<bool> {
        self.acknowledged(Message::request(Command::RebootGps)).await
    }

    /// Applies the extended behavior switches.
    pub async fn set_extended_settings(&self, settings: ExtendedSettings) -> MeiligaoResult<bool> {
        self.acknowledged(Message::request_text(
            Command::SetExtendedSettings,
            settings.to_digits(),
        ))
        .await
    }

    /// Sets the keep-alive interval in minutes.
    pub async fn set_heartbeat_interval(&self, minutes: u8) -> MeiligaoResult<bool> {
        self.acknowledged(Message::request_text(
            Command::SetHeartbeatInterval,
            minutes.to_string(),
        ))
        .await
    }

    /// Resets the accumulated odometer.
    pub async fn clear_mileage(&self) -> MeiligaoResult<bool> {
        self.acknowledged(Message::request(Command::ClearMileage)).await
    }

    /// Powers the device down after `minutes` without movement, 0 to 99.
    pub async fn set_power_down_timeout(&self, minutes: u8) -> MeiligaoResult<bool> {
        if minutes > 99 {
            return Err(MeiligaoError::InvalidParameter(format!(
                "power-down timeout {minutes} exceeds 99 minutes"
            )));
        }
        self.acknowledged(Message::request_text(
            Command::SetPowerDownTimeout,
            minutes.to_string(),
        ))
        .await
    }

    /// Retrieves every waypoint stored while the device was offline.
    ///
    /// Pages through the device memory with the dialog tags the device
    /// echoes back, stopping once it reports one page left. Pages with no
    /// report text contribute nothing.
    pub async fn get_memory_reports(&self) -> MeiligaoResult<Vec<Position>> {
        let (mut device_tag, mut host_tag) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(1..=u8::MAX), rng.gen_range(1..=u8::MAX))
        };
        let mut page_index: u8 = 1;
        let mut positions = Vec::new();
        loop {
            let request = Message::request_raw(
                Command::GetMemoryReport,
                vec![device_tag, host_tag, page_index],
            );
            let response = self.request(request).await?;
            let page = MemoryPage::decode(&response.payload)?;
            if let Some(position) = page.position()? {
                positions.push(position);
            }
            if page.remaining <= 1 {
                return Ok(positions);
            }
            device_tag = page.device_tag;
            host_tag = page.host_tag;
            page_index = page_index.wrapping_add(1);
        }
    }

    /// Sets how often offline waypoints are recorded, 1 to 255 minutes.
    pub async fn set_memory_report_interval(&self, minutes: u8) -> MeiligaoResult<bool> {
        if minutes == 0 {
            return Err(MeiligaoError::InvalidParameter(
                "memory report interval must be at least 1 minute".into(),
            ));
        }
        self.acknowledged(Message::request_text(
            Command::SetMemoryReportInterval,
            minutes.to_string(),
        ))
        .await
    }

    /// Discards every stored waypoint.
    pub async fn clear_memory_reports(&self) -> MeiligaoResult<bool> {
        self.acknowledged(Message::request(Command::ClearMemoryReports))
            .await
    }

    /// Reads the authorized SMS and call numbers.
    pub async fn get_authorized_phones(&self) -> MeiligaoResult<AuthorizedPhones> {
        let response = self
            .request(Message::request(Command::GetAuthorizedPhone))
            .await?;
        match payload::decode_result(response.command, &response.payload)? {
            CommandData::Phones(phones) => Ok(phones),
            _ => Err(unexpected(&response)),
        }
    }

    /// Sets the authorized SMS and call numbers, each 1 to 16 characters
    /// of `0-9`, `*`, `#` or `+`.
    pub async fn set_authorized_phones(&self, sms: &str, call: &str) -> MeiligaoResult<bool> {
        let encoded = payload::encode_phones(sms, call)?;
        self.acknowledged(Message::request_raw(Command::SetAuthorizedPhone, encoded))
            .await
    }

    /// Reads the periodic report interval in seconds.
    pub async fn get_report_time_interval(&self) -> MeiligaoResult<u32> {
        let response = self
            .request(Message::request(Command::GetReportTimeInterval))
            .await?;
        match payload::decode_result(response.command, &response.payload)? {
            CommandData::IntervalSeconds(seconds) => Ok(seconds),
            _ => Err(unexpected(&response)),
        }
    }

    /// Sets the periodic report interval in seconds.
    pub async fn set_report_time_interval(&self, seconds: u16) -> MeiligaoResult<bool> {
        self.acknowledged(Message::request_text(
            Command::SetReportTimeInterval,
            seconds.to_string(),
        ))
        .await
    }

    /// Reports every `meters` traveled; 0 disables, otherwise at least
    /// 300 m.
    pub async fn set_report_distance_interval(&self, meters: u16) -> MeiligaoResult<bool> {
        if meters != 0 && meters < 300 {
            return Err(MeiligaoError::InvalidParameter(format!(
                "distance interval {meters} is below the 300 m minimum"
            )));
        }
        self.acknowledged(Message::request_text(
            Command::SetReportDistanceInterval,
            meters.to_string(),
        ))
        .await
    }

    /// Arms the speeding alarm; `limit` is in units of 10 km/h, 0 to 20.
    pub async fn set_alarm_speeding(&self, limit: u8) -> MeiligaoResult<bool> {
        if limit > 20 {
            return Err(MeiligaoError::InvalidParameter(format!(
                "speeding limit {limit} exceeds 20 (units of 10 km/h)"
            )));
        }
        self.acknowledged(Message::request_text(
            Command::SetAlarmSpeeding,
            format!("{limit:02}"),
        ))
        .await
    }

    /// Arms the movement alarm with an area-size code, 0 to 8.
    pub async fn set_alarm_movement(&self, area: u8) -> MeiligaoResult<bool> {
        self.area_alarm(Command::SetAlarmMovement, area).await
    }

    /// Arms the geo-fence alarm with an area-size code, 0 to 8.
    pub async fn set_alarm_geofence(&self, area: u8) -> MeiligaoResult<bool> {
        self.area_alarm(Command::SetAlarmGeofence, area).await
    }

    async fn area_alarm(&self, command: Command, area: u8) -> MeiligaoResult<bool> {
        if area > 8 {
            return Err(MeiligaoError::InvalidParameter(format!(
                "area size code {area} exceeds 8"
            )));
        }
        self.acknowledged(Message::request_text(command, format!("{area:02}")))
            .await
    }

    async fn acknowledged(&self, message: Message) -> MeiligaoResult<bool> {
        let response = self.request(message).await?;
        match payload::decode_result(response.command, &response.payload)? {
            CommandData::Acknowledge(ok) => Ok(ok),
            _ => Err(unexpected(&response)),
        }
    }
}

fn unexpected(response: &Message) -> MeiligaoError {
    MeiligaoError::malformed(response.command, "response shape does not match the request")
}
