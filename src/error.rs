//! Error types for the crclink crate

use std::fmt;
use thiserror::Error;

/// Result type for link operations
pub type Result<T> = std::result::Result<T, LinkError>;

/// Error type covering configuration, codec, and transport failures.
///
/// Protocol-level conditions (checksum mismatch, retry exhaustion, stale
/// acknowledgments) are deliberately *not* errors; they surface through
/// [`SendOutcome`](crate::link::SendOutcome) and the metrics counters.
#[derive(Error, Debug)]
pub enum LinkError {
    /// I/O related errors (a transport send failure aborts a retry loop)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed frame rejected by the codec
    #[error("frame error: {kind}")]
    Frame { kind: FrameError },

    /// Configuration errors (bad generator polynomial, zero retries)
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Session lifecycle errors
    #[error("session error: {message}")]
    Session { message: String },
}

/// Specific codec failure kinds.
///
/// An unparsable frame carries no trustworthy sequence or type, so the
/// receive path takes no protocol action for any of these (no ACK/NACK).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than header + checksum byte
    TooShort { len: usize },
    /// Declared payload length disagrees with the bytes actually present
    LengthMismatch { declared: usize, actual: usize },
    /// Type byte outside the known DATA/ACK/NACK range
    UnknownType { value: u8 },
    /// Payload does not fit the 16-bit length field (build side)
    PayloadTooLarge { len: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TooShort { len } => {
                write!(f, "frame too short: {} bytes", len)
            }
            FrameError::LengthMismatch { declared, actual } => {
                write!(
                    f,
                    "length field says {} but payload is {} bytes",
                    declared, actual
                )
            }
            FrameError::UnknownType { value } => {
                write!(f, "unknown frame type {:#04x}", value)
            }
            FrameError::PayloadTooLarge { len } => {
                write!(f, "payload of {} bytes exceeds the 16-bit length field", len)
            }
        }
    }
}

impl From<FrameError> for LinkError {
    fn from(kind: FrameError) -> Self {
        LinkError::Frame { kind }
    }
}

impl LinkError {
    /// Create a frame error
    pub fn frame(kind: FrameError) -> Self {
        LinkError::Frame { kind }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        LinkError::Config {
            message: message.into(),
        }
    }

    /// Create a session error
    pub fn session(message: impl Into<String>) -> Self {
        LinkError::Session {
            message: message.into(),
        }
    }

    /// Check if this is a codec-level frame error
    pub fn is_frame_error(&self) -> bool {
        matches!(self, LinkError::Frame { .. })
    }

    /// Check if this error came from the transport
    pub fn is_transport_error(&self) -> bool {
        matches!(self, LinkError::Io(_))
    }
}
