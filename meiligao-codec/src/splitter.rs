//! Incremental frame delimiting
//!
//! Trackers write frames back to back over TCP, so read chunks land on
//! arbitrary boundaries. The splitter buffers chunks and yields complete
//! items: delimited frames, plus the single-byte heartbeat keepalive that
//! travels unframed between them.

use bytes::{Buf, Bytes, BytesMut};
use meiligao_core::Direction;

use crate::frame::TERMINATOR;

/// Heartbeat marker byte.
pub const HEARTBEAT: u8 = 0x00;

/// Longest buffered run without a terminator before the splitter drains
/// itself through the decode path.
const MAX_BUFFER: usize = 1024;

/// Shortest delimited frame the length header can declare.
const MIN_DECLARED: usize = 17;

/// One item recovered from the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameItem {
    /// The unframed keepalive byte.
    Heartbeat,
    /// One frame, terminator included; not yet validated.
    Frame(Bytes),
}

/// Splits a raw byte stream into frames and heartbeat markers.
///
/// The splitter is always positioned at an item boundary, and no frame
/// begins with a zero byte, so a leading zero is unambiguously a
/// heartbeat.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buf: BytesMut,
}

impl FrameSplitter {
    pub fn new() -> Self {
        FrameSplitter {
            buf: BytesMut::new(),
        }
    }

    /// Appends one read chunk.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Yields the next complete item, or `None` until more bytes arrive.
    pub fn next_item(&mut self) -> Option<FrameItem> {
        if self.buf.first() == Some(&HEARTBEAT) {
            self.buf.advance(1);
            return Some(FrameItem::Heartbeat);
        }
        if let Some(at) = find_terminator(&self.buf) {
            let frame = self.buf.split_to(at + TERMINATOR.len()).freeze();
            return Some(FrameItem::Frame(frame));
        }
        if self.buf.len() > MAX_BUFFER {
            // Unterminated garbage; hand it to decode so it is reported
            // instead of buffered forever.
            return Some(FrameItem::Frame(self.buf.split().freeze()));
        }
        None
    }
}

/// Position of the frame terminator.
///
/// A CRC trailer or raw payload byte pair can equal CR LF, so the first
/// candidate is not necessarily the delimiter. The length header settles
/// it: a candidate ending before the declared frame end is frame content
/// and scanning continues. Without a plausible header the first candidate
/// wins, keeping the delimiter authoritative for garbage input.
fn find_terminator(buf: &[u8]) -> Option<usize> {
    let declared = declared_len(buf);
    let mut from = 0;
    loop {
        let at = from
            + buf[from..]
                .windows(TERMINATOR.len())
                .position(|window| window == TERMINATOR)?;
        match declared {
            Some(end) if at + TERMINATOR.len() < end => from = at + 1,
            _ => return Some(at),
        }
    }
}

/// Frame length the header declares, when the buffer starts with a valid
/// prefix and the value is plausible.
fn declared_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < 4 || Direction::from_marker([buf[0], buf[1]]).is_none() {
        return None;
    }
    let len = usize::from(u16::from_be_bytes([buf[2], buf[3]]));
    (MIN_DECLARED..=MAX_BUFFER).contains(&len).then_some(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Message;
    use meiligao_core::{Command, Direction};

    fn login_frame() -> Bytes {
        Message::new(Direction::FromDevice, Command::Login.code(), Bytes::new())
            .with_device_id("13512345678".parse().unwrap())
            .encode()
    }

    #[test]
    fn test_whole_frame() {
        let frame = login_frame();
        let mut splitter = FrameSplitter::new();
        splitter.push(&frame);
        assert_eq!(splitter.next_item(), Some(FrameItem::Frame(frame)));
        assert_eq!(splitter.next_item(), None);
    }

    #[test]
    fn test_byte_at_a_time() {
        let frame = login_frame();
        let mut splitter = FrameSplitter::new();
        for &byte in frame.iter() {
            assert_eq!(splitter.next_item(), None);
            splitter.push(&[byte]);
        }
        assert_eq!(splitter.next_item(), Some(FrameItem::Frame(frame)));
    }

    #[test]
    fn test_heartbeat_between_frames() {
        let frame = login_frame();
        let mut chunk = frame.to_vec();
        chunk.push(HEARTBEAT);
        chunk.extend_from_slice(&frame);

        let mut splitter = FrameSplitter::new();
        splitter.push(&chunk);
        assert_eq!(splitter.next_item(), Some(FrameItem::Frame(frame.clone())));
        assert_eq!(splitter.next_item(), Some(FrameItem::Heartbeat));
        assert_eq!(splitter.next_item(), Some(FrameItem::Frame(frame)));
        assert_eq!(splitter.next_item(), None);
    }

    #[test]
    fn test_lone_heartbeat() {
        let mut splitter = FrameSplitter::new();
        splitter.push(&[HEARTBEAT]);
        assert_eq!(splitter.next_item(), Some(FrameItem::Heartbeat));
        assert_eq!(splitter.next_item(), None);
    }

    #[test]
    fn test_two_frames_one_chunk() {
        let frame = login_frame();
        let mut chunk = frame.to_vec();
        chunk.extend_from_slice(&frame);

        let mut splitter = FrameSplitter::new();
        splitter.push(&chunk);
        assert_eq!(splitter.next_item(), Some(FrameItem::Frame(frame.clone())));
        assert_eq!(splitter.next_item(), Some(FrameItem::Frame(frame)));
    }

    #[test]
    fn test_terminator_bytes_inside_a_frame_do_not_split_it() {
        // Memory-page tags are raw octets and may collide with CR LF.
        let frame = Message::new(
            Direction::FromDevice,
            Command::GetMemoryReport.code(),
            vec![0x0d, 0x0a, 0x01],
        )
        .with_device_id("13512345678".parse().unwrap())
        .encode();
        assert_eq!(&frame[13..15], b"\r\n");

        let mut splitter = FrameSplitter::new();
        splitter.push(&frame);
        assert_eq!(splitter.next_item(), Some(FrameItem::Frame(frame.clone())));
        assert_eq!(splitter.next_item(), None);
        assert!(Message::decode(&frame).is_ok());
    }

    #[test]
    fn test_embedded_terminator_reassembles_across_chunks() {
        let frame = Message::new(
            Direction::FromDevice,
            Command::GetMemoryReport.code(),
            vec![0x42, 0x0d, 0x0a],
        )
        .with_device_id("13512345678".parse().unwrap())
        .encode();

        let mut splitter = FrameSplitter::new();
        let (head, tail) = frame.split_at(15);
        splitter.push(head);
        assert_eq!(splitter.next_item(), None);
        splitter.push(tail);
        assert_eq!(splitter.next_item(), Some(FrameItem::Frame(frame.clone())));
        splitter.push(&frame);
        assert_eq!(splitter.next_item(), Some(FrameItem::Frame(frame)));
    }

    #[test]
    fn test_implausible_length_falls_back_to_the_first_terminator() {
        let mut splitter = FrameSplitter::new();
        splitter.push(b"$$\x00\x05xx\r\nrest");
        match splitter.next_item() {
            Some(FrameItem::Frame(garbage)) => {
                assert_eq!(garbage.as_ref(), b"$$\x00\x05xx\r\n");
                assert!(Message::decode(&garbage).is_err());
            }
            other => panic!("expected a garbage frame, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_garbage_drains() {
        let mut splitter = FrameSplitter::new();
        splitter.push(&[b'x'; MAX_BUFFER + 1]);
        match splitter.next_item() {
            Some(FrameItem::Frame(garbage)) => {
                assert_eq!(garbage.len(), MAX_BUFFER + 1);
                assert!(Message::decode(&garbage).is_err());
            }
            other => panic!("expected drained garbage frame, got {other:?}"),
        }
        assert_eq!(splitter.next_item(), None);
    }
}
