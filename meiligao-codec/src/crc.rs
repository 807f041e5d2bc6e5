//! CRC16/CCITT checksum for frame trailers

/// CRC calculation constants
const INITIAL_CRC: u16 = 0xFFFF;
const POLY: u16 = 0x1021;

/// Precomputed CRC table
static CRC_TABLE: once_cell::sync::Lazy<[u16; 256]> = once_cell::sync::Lazy::new(|| {
    let mut table = [0u16; 256];
    for b in 0..=0xFFu16 {
        let mut v = b << 8;
        for _ in 0..8 {
            if (v & 0x8000) != 0 {
                v = (v << 1) ^ POLY;
            } else {
                v <<= 1;
            }
        }
        table[b as usize] = v;
    }
    table
});

/// Streaming CRC16/CCITT calculator
pub struct CrcCalc {
    crc_value: u16,
}

impl CrcCalc {
    /// Create a new calculator with the initial register value
    pub fn new() -> Self {
        Self {
            crc_value: INITIAL_CRC,
        }
    }

    /// Reset the register to its initial state
    pub fn reset(&mut self) {
        self.crc_value = INITIAL_CRC;
    }

    /// Update the checksum with a single byte
    pub fn update(&mut self, data: u8) {
        self.crc_value =
            (self.crc_value << 8) ^ CRC_TABLE[((self.crc_value >> 8) ^ data as u16) as usize];
    }

    /// Update the checksum with multiple bytes
    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Get the current checksum value
    pub fn value(&self) -> u16 {
        self.crc_value
    }
}

impl Default for CrcCalc {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC16/CCITT of one contiguous buffer
pub fn checksum(data: &[u8]) -> u16 {
    let mut calc = CrcCalc::new();
    calc.update_bytes(data);
    calc.value()
}
