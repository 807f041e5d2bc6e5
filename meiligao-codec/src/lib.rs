//! Wire frame codec for the Meiligao GPS tracker protocol
//!
//! Pure transforms between raw bytes and structured frames: CRC16/CCITT
//! checksums, frame encode/decode, stream delimiting, and per-command
//! payload decoders. No I/O and no session state live here.

pub mod crc;
pub mod frame;
pub mod payload;
pub mod splitter;

pub use frame::Message;
pub use payload::{CommandData, MemoryPage};
pub use splitter::{FrameItem, FrameSplitter};
