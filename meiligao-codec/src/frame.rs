//! Frame encoding and decoding
//!
//! Wire layout, all fields raw bytes:
//!
//! ```text
//! [2B prefix][2B length][7B device id][2B command][N B payload][2B CRC][CR LF]
//! ```
//!
//! The prefix is `$$` for device-to-server frames and `@@` for
//! server-to-device frames. The length field counts the whole frame,
//! terminator included. The device id field packs one decimal digit per
//! nibble, right-filled with `f`. The checksum is CRC16/CCITT over every
//! byte before it.

use std::borrow::Cow;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use meiligao_core::{Command, DeviceId, Direction, MeiligaoError, MeiligaoResult};

use crate::crc;

/// Frame terminator, doubling as the stream delimiter.
pub const TERMINATOR: [u8; 2] = *b"\r\n";

/// Frame bytes besides the payload: prefix, length, id, command, checksum,
/// terminator.
const OVERHEAD: usize = 17;
/// Smallest possible delimited frame once the terminator is stripped.
const MIN_FRAME: usize = 15;
/// Nibble marking unused device id positions.
const FILLER: u8 = 0xf;

/// One protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Unset until learned; encodes as an all-filler field.
    pub device_id: Option<DeviceId>,
    pub command: u16,
    pub payload: Bytes,
    pub direction: Direction,
}

impl Message {
    /// Creates a frame from its parts.
    pub fn new(direction: Direction, command: u16, payload: impl Into<Bytes>) -> Self {
        Message {
            device_id: None,
            command,
            payload: payload.into(),
            direction,
        }
    }

    /// Server-to-device request with an empty payload.
    pub fn request(command: Command) -> Self {
        Message::new(Direction::ToDevice, command.code(), Bytes::new())
    }

    /// Server-to-device request carrying ASCII text.
    pub fn request_text(command: Command, text: impl Into<String>) -> Self {
        Message::new(Direction::ToDevice, command.code(), text.into().into_bytes())
    }

    /// Server-to-device request carrying raw octets.
    pub fn request_raw(command: Command, payload: impl Into<Bytes>) -> Self {
        Message::new(Direction::ToDevice, command.code(), payload.into())
    }

    /// Sets the device id field.
    pub fn with_device_id(mut self, id: DeviceId) -> Self {
        self.device_id = Some(id);
        self
    }

    /// The command, when its code is in the registry.
    pub fn known_command(&self) -> Option<Command> {
        Command::from_code(self.command)
    }

    /// Payload viewed as text, for the delimited-ASCII commands.
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Encodes the frame, checksum and terminator included.
    pub fn encode(&self) -> Bytes {
        let total = self.payload.len() + OVERHEAD;
        let mut buf = BytesMut::with_capacity(total);
        buf.put_slice(&self.direction.marker());
        buf.put_u16(total as u16);
        buf.put_slice(&encode_device_id(self.device_id));
        buf.put_u16(self.command);
        buf.put_slice(&self.payload);
        let checksum = crc::checksum(&buf);
        buf.put_u16(checksum);
        buf.put_slice(&TERMINATOR);
        buf.freeze()
    }

    /// Decodes one delimited frame. A trailing terminator is accepted and
    /// stripped; the length field is advisory since the delimiter already
    /// decided the frame's extent.
    ///
    /// # Errors
    ///
    /// `TruncatedFrame` below the minimum layout size, `ChecksumMismatch`
    /// when the trailer does not match the preceding bytes (checked first,
    /// so corruption anywhere in the frame reports here), `UnknownPrefix`
    /// for an unrecognized direction marker.
    pub fn decode(frame: &[u8]) -> MeiligaoResult<Message> {
        let body = frame.strip_suffix(&TERMINATOR).unwrap_or(frame);
        if body.len() < MIN_FRAME {
            return Err(MeiligaoError::TruncatedFrame(frame.len()));
        }

        let (covered, trailer) = body.split_at(body.len() - 2);
        let received = u16::from_be_bytes([trailer[0], trailer[1]]);
        let computed = crc::checksum(covered);
        if computed != received {
            return Err(MeiligaoError::ChecksumMismatch { computed, received });
        }

        let marker = [covered[0], covered[1]];
        let direction =
            Direction::from_marker(marker).ok_or(MeiligaoError::UnknownPrefix(marker))?;
        let device_id = decode_device_id(&covered[4..11]);
        let command = u16::from_be_bytes([covered[11], covered[12]]);
        let payload = Bytes::copy_from_slice(&covered[13..]);

        Ok(Message {
            device_id,
            command,
            payload,
            direction,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = self.direction.marker();
        write!(f, "prefix={}{} id=", marker[0] as char, marker[1] as char)?;
        match self.device_id {
            Some(id) => write!(f, "{id}")?,
            None => f.write_str("unset")?,
        }
        let name = self.known_command().map_or("UNKNOWN", Command::name);
        write!(f, " command={name}({:#06x}) payload=", self.command)?;
        if self.payload.is_empty() {
            f.write_str("\"\"")
        } else if self
            .payload
            .iter()
            .all(|b| b.is_ascii_graphic() || *b == b' ')
        {
            write!(f, "{:?}", self.payload_text())
        } else {
            for byte in &self.payload {
                write!(f, "{byte:02x}")?;
            }
            Ok(())
        }
    }
}

/// Packs a device id into the 14-nibble wire field.
fn encode_device_id(id: Option<DeviceId>) -> [u8; 7] {
    let digits = id.map(|id| id.to_string()).unwrap_or_default();
    let nibble = |index: usize| digits.as_bytes().get(index).map_or(FILLER, |b| b - b'0');
    let mut field = [0u8; 7];
    for (i, slot) in field.iter_mut().enumerate() {
        *slot = (nibble(2 * i) << 4) | nibble(2 * i + 1);
    }
    field
}

/// Reads leading decimal-digit nibbles base-10; the first non-digit nibble
/// (normally the `f` filler) ends the id. No digits means the device has
/// not identified itself.
fn decode_device_id(field: &[u8]) -> Option<DeviceId> {
    let mut value = 0u64;
    let mut digits = 0;
    for nibble in field.iter().flat_map(|&b| [b >> 4, b & 0x0f]) {
        if nibble > 9 {
            break;
        }
        value = value * 10 + nibble as u64;
        digits += 1;
    }
    if digits == 0 {
        return None;
    }
    DeviceId::new(value).ok()
}
