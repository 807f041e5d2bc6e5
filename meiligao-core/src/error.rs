use thiserror::Error;

/// Main error type for meiligao operations
#[derive(Error, Debug)]
pub enum MeiligaoError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Checksum mismatch: computed {computed:#06x}, frame carries {received:#06x}")]
    ChecksumMismatch { computed: u16, received: u16 },

    #[error("Unknown frame prefix: {0:02x?}")]
    UnknownPrefix([u8; 2]),

    #[error("Frame too short: {0} bytes")]
    TruncatedFrame(usize),

    #[error("Malformed payload for command {command:#06x}: {reason}")]
    MalformedPayload { command: u16, reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Connection closed before a response arrived")]
    ConnectionClosed,
}

impl MeiligaoError {
    /// Shorthand for payload decoders reporting a shape violation.
    pub fn malformed(command: u16, reason: impl Into<String>) -> Self {
        MeiligaoError::MalformedPayload {
            command,
            reason: reason.into(),
        }
    }
}

/// Result type alias for meiligao operations
pub type MeiligaoResult<T> = Result<T, MeiligaoError>;
