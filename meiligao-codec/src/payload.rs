//! Per-command result payload decoders
//!
//! Every command answers with its own positional or delimited ASCII shape;
//! this module maps raw response payloads to typed values and packs the
//! structured request payloads that are not plain decimal text.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, NaiveDate, Utc};
use meiligao_core::{
    AlarmKind, AuthorizedPhones, Command, MeiligaoError, MeiligaoResult, Position, SnImei,
};

/// Width of each authorized-phone field on the wire.
const PHONE_FIELD: usize = 16;

/// Typed result decoded from a response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandData {
    SnImei(SnImei),
    IntervalSeconds(u32),
    Phones(AuthorizedPhones),
    Acknowledge(bool),
    Position(Position),
    Alarm { kind: AlarmKind, position: Position },
    MemoryPage(MemoryPage),
    /// Command code outside the registry; only the raw payload is
    /// available.
    Raw,
}

/// One page of the stored-report retrieval dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPage {
    /// Device-side dialog tag, possibly reassigned by the device.
    pub device_tag: u8,
    /// Host-side dialog tag.
    pub host_tag: u8,
    /// Waypoints still stored, this page included.
    pub remaining: u8,
    /// Raw report text of this page; empty when the memory is empty.
    pub report: Bytes,
}

impl MemoryPage {
    pub fn decode(payload: &[u8]) -> MeiligaoResult<MemoryPage> {
        if payload.len() < 3 {
            return Err(MeiligaoError::malformed(
                Command::GetMemoryReport.code(),
                "page needs device tag, host tag and remaining count",
            ));
        }
        Ok(MemoryPage {
            device_tag: payload[0],
            host_tag: payload[1],
            remaining: payload[2],
            report: Bytes::copy_from_slice(&payload[3..]),
        })
    }

    /// Decodes this page's report text into a position; `None` when the
    /// page carries no text (empty memory).
    pub fn position(&self) -> MeiligaoResult<Option<Position>> {
        if self.report.is_empty() {
            return Ok(None);
        }
        decode_position_for(Command::GetMemoryReport.code(), &self.report).map(Some)
    }
}

/// Dispatches a response payload to the decoder its command prescribes.
pub fn decode_result(command: u16, payload: &[u8]) -> MeiligaoResult<CommandData> {
    let data = match Command::from_code(command) {
        Some(Command::GetSnImei) => CommandData::SnImei(decode_sn_imei(payload)?),
        Some(Command::GetReportTimeInterval) => {
            CommandData::IntervalSeconds(decode_interval(payload)?)
        }
        Some(Command::GetAuthorizedPhone) => CommandData::Phones(decode_phones(payload)?),
        Some(Command::SetReportTimeIntervalResult) => {
            CommandData::Acknowledge(decode_first_byte_ack(payload))
        }
        Some(Command::GetMemoryReport) => CommandData::MemoryPage(MemoryPage::decode(payload)?),
        Some(Command::Report) => CommandData::Position(decode_position(payload)?),
        Some(Command::Alarm) => {
            let (kind, position) = decode_alarm(payload)?;
            CommandData::Alarm { kind, position }
        }
        Some(_) if is_boolean_ack(command) => CommandData::Acknowledge(decode_ack(payload)),
        _ => CommandData::Raw,
    };
    Ok(data)
}

/// Commands acknowledged with the generic nonzero-payload rule.
pub fn is_boolean_ack(command: u16) -> bool {
    matches!(
        Command::from_code(command),
        Some(
            Command::ResetConfiguration
                | Command::RebootGps
                | Command::SetExtendedSettings
                | Command::SetHeartbeatInterval
                | Command::ClearMileage
                | Command::SetPowerDownTimeout
                | Command::SetMemoryReportInterval
                | Command::ClearMemoryReports
                | Command::SetAuthorizedPhone
                | Command::SetReportDistanceInterval
                | Command::SetAlarmSpeeding
                | Command::SetAlarmMovement
                | Command::SetAlarmGeofence
        )
    )
}

/// Generic acknowledge: the whole payload read as one integer, nonzero
/// means accepted.
pub fn decode_ack(payload: &[u8]) -> bool {
    payload.iter().any(|&b| b != 0)
}

/// The report-interval result signals in its first byte only; devices pad
/// the remainder with unrelated data.
pub fn decode_first_byte_ack(payload: &[u8]) -> bool {
    payload.first().is_some_and(|&b| b != 0)
}

/// Serial number and IMEI, comma-delimited.
pub fn decode_sn_imei(payload: &[u8]) -> MeiligaoResult<SnImei> {
    let command = Command::GetSnImei.code();
    let text = payload_str(command, payload)?;
    let (sn, imei) = text
        .split_once(',')
        .ok_or_else(|| MeiligaoError::malformed(command, "expected comma-delimited sn,imei"))?;
    Ok(SnImei {
        sn: sn.to_string(),
        imei: imei.to_string(),
    })
}

/// Report interval in seconds, transmitted as a big-endian integer.
pub fn decode_interval(payload: &[u8]) -> MeiligaoResult<u32> {
    let command = Command::GetReportTimeInterval.code();
    if payload.is_empty() || payload.len() > 4 {
        return Err(MeiligaoError::malformed(
            command,
            format!("interval field of {} bytes", payload.len()),
        ));
    }
    Ok(payload.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}

/// Authorized SMS and call numbers, two fixed-width zero-padded fields.
pub fn decode_phones(payload: &[u8]) -> MeiligaoResult<AuthorizedPhones> {
    let command = Command::GetAuthorizedPhone.code();
    if payload.len() < 2 * PHONE_FIELD {
        return Err(MeiligaoError::malformed(
            command,
            format!(
                "phone payload of {} bytes, need {}",
                payload.len(),
                2 * PHONE_FIELD
            ),
        ));
    }
    Ok(AuthorizedPhones {
        sms: phone_field(command, &payload[..PHONE_FIELD])?,
        call: phone_field(command, &payload[PHONE_FIELD..2 * PHONE_FIELD])?,
    })
}

/// Packs two numbers into the fixed 32-byte set-phones payload.
///
/// # Errors
///
/// `InvalidParameter` when a number is empty, longer than the wire field,
/// or holds characters outside `0-9`, `*`, `#`, `+`.
pub fn encode_phones(sms: &str, call: &str) -> MeiligaoResult<Bytes> {
    let mut payload = BytesMut::with_capacity(2 * PHONE_FIELD);
    put_phone_field(&mut payload, sms)?;
    put_phone_field(&mut payload, call)?;
    Ok(payload.freeze())
}

/// Position report payload.
pub fn decode_position(payload: &[u8]) -> MeiligaoResult<Position> {
    decode_position_for(Command::Report.code(), payload)
}

/// Alarm payload: one classifier byte, then an embedded position record.
pub fn decode_alarm(payload: &[u8]) -> MeiligaoResult<(AlarmKind, Position)> {
    let command = Command::Alarm.code();
    let (&kind, rest) = payload
        .split_first()
        .ok_or_else(|| MeiligaoError::malformed(command, "empty alarm payload"))?;
    let position = decode_position_for(command, rest)?;
    Ok((AlarmKind::from_code(kind), position))
}

/// The position record shared by reports, alarms, and memory pages.
///
/// Two `*`-delimited sections. The navigation section is comma-delimited:
/// time `hhmmss[.sss]`, validity flag, latitude `ddmm.mmmm` + `N`/`S`,
/// longitude `dddmm.mmmm` + `E`/`W`, speed, heading, date `ddmmyy`. The
/// telemetry section is `|`-delimited: altitude, I/O status, analog
/// inputs, base-station id, signal quality, odometer.
fn decode_position_for(command: u16, payload: &[u8]) -> MeiligaoResult<Position> {
    let malformed = |reason: &str| MeiligaoError::malformed(command, reason);
    let text = payload_str(command, payload)?;
    let (nav, telemetry) = text
        .split_once('*')
        .ok_or_else(|| malformed("missing `*` section divider"))?;

    let nav: Vec<&str> = nav.split(',').collect();
    if nav.len() < 9 {
        return Err(malformed("navigation section needs 9 fields"));
    }
    let timestamp = parse_timestamp(command, nav[0], nav[8])?;
    let valid = nav[1] == "A";
    let latitude = parse_angle(command, nav[2], 2, "latitude")?;
    let latitude = match nav[3] {
        "N" => latitude,
        "S" => -latitude,
        _ => return Err(malformed("latitude hemisphere")),
    };
    let longitude = parse_angle(command, nav[4], 3, "longitude")?;
    let longitude = match nav[5] {
        "E" => longitude,
        "W" => -longitude,
        _ => return Err(malformed("longitude hemisphere")),
    };
    let speed_knots = parse_number(command, nav[6], "speed")?;
    let heading = parse_number(command, nav[7], "heading")?;

    let fields: Vec<&str> = telemetry.split('|').collect();
    // The `*|` junction leaves a leading empty element.
    let fields = match fields.split_first() {
        Some((&"", rest)) => rest,
        _ => &fields[..],
    };
    if fields.len() < 6 {
        return Err(malformed("telemetry section needs 6 fields"));
    }

    Ok(Position {
        timestamp,
        valid,
        latitude,
        longitude,
        speed_knots,
        heading,
        altitude: parse_number(command, fields[0], "altitude")?,
        io_status: fields[1].to_string(),
        analog_inputs: fields[2].split(',').map(str::to_string).collect(),
        base_station: fields[3].to_string(),
        signal_quality: fields[4]
            .parse()
            .map_err(|_| malformed("signal quality"))?,
        odometer: fields[5].parse().map_err(|_| malformed("odometer"))?,
    })
}

fn payload_str(command: u16, payload: &[u8]) -> MeiligaoResult<&str> {
    if !payload.is_ascii() {
        return Err(MeiligaoError::malformed(
            command,
            "payload is not ASCII text",
        ));
    }
    std::str::from_utf8(payload)
        .map_err(|_| MeiligaoError::malformed(command, "payload is not ASCII text"))
}

/// `ddmm.mmmm`-style angle: a fixed-width integer-degree prefix plus
/// minutes over 60.
fn parse_angle(command: u16, raw: &str, degree_digits: usize, field: &str) -> MeiligaoResult<f64> {
    let malformed = || MeiligaoError::malformed(command, format!("unparsable {field}: {raw:?}"));
    if raw.len() <= degree_digits {
        return Err(malformed());
    }
    let (degrees, minutes) = raw.split_at(degree_digits);
    let degrees: f64 = degrees.parse().map_err(|_| malformed())?;
    let minutes: f64 = minutes.parse().map_err(|_| malformed())?;
    Ok(degrees + minutes / 60.0)
}

fn parse_number(command: u16, raw: &str, field: &str) -> MeiligaoResult<f64> {
    raw.trim()
        .parse()
        .map_err(|_| MeiligaoError::malformed(command, format!("unparsable {field}: {raw:?}")))
}

/// Combines the `hhmmss[.sss]` time and `ddmmyy` date fields into one UTC
/// timestamp, century 2000.
fn parse_timestamp(command: u16, time: &str, date: &str) -> MeiligaoResult<DateTime<Utc>> {
    let malformed = |what: &str| MeiligaoError::malformed(command, format!("unparsable {what}"));
    if time.len() < 6 || date.len() != 6 {
        return Err(malformed("time/date field width"));
    }
    let digits = |s: &str, what: &str| -> MeiligaoResult<u32> {
        s.parse().map_err(|_| malformed(what))
    };

    let hour = digits(&time[0..2], "hour")?;
    let minute = digits(&time[2..4], "minute")?;
    let second = digits(&time[4..6], "second")?;
    let millis = match time[6..].strip_prefix('.') {
        Some(frac) if !frac.is_empty() => {
            let frac = &frac[..frac.len().min(3)];
            digits(frac, "time fraction")? * 10u32.pow(3 - frac.len() as u32)
        }
        Some(_) => return Err(malformed("time fraction")),
        None if time.len() == 6 => 0,
        None => return Err(malformed("time fraction")),
    };

    let day = digits(&date[0..2], "day")?;
    let month = digits(&date[2..4], "month")?;
    let year = 2000 + digits(&date[4..6], "year")? as i32;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_milli_opt(hour, minute, second, millis))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| malformed("calendar date/time"))
}

fn phone_field(command: u16, field: &[u8]) -> MeiligaoResult<String> {
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let digits = &field[..end];
    if !digits.is_ascii() {
        return Err(MeiligaoError::malformed(command, "phone field is not ASCII"));
    }
    Ok(String::from_utf8_lossy(digits).into_owned())
}

fn put_phone_field(buf: &mut BytesMut, number: &str) -> MeiligaoResult<()> {
    if number.is_empty() || number.len() > PHONE_FIELD {
        return Err(MeiligaoError::InvalidParameter(format!(
            "phone number must be 1..={PHONE_FIELD} characters, got {number:?}"
        )));
    }
    if !number
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'*' | b'#'))
    {
        return Err(MeiligaoError::InvalidParameter(format!(
            "phone number has invalid characters: {number:?}"
        )));
    }
    buf.put_slice(number.as_bytes());
    buf.put_bytes(0, PHONE_FIELD - number.len());
    Ok(())
}
