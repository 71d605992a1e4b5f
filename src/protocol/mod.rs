//! Wire protocol for remote file editing.
//!
//! Every message in either direction is a frame with a fixed 8-byte header:
//!
//! ```text
//! offset 0      : 1 byte  message type (1=OK, 2=WRITE, 3=CLEAR, 4=ERROR, 5=PING)
//! offset 1..3   : 3 bytes reserved (zero on encode, ignored on decode)
//! offset 4..7   : 4 bytes content length (unsigned, big-endian)
//! offset 8..    : content length bytes of raw content
//! ```
//!
//! Example:
//!
//! ```text
//! Request:  02 00 00 00 00 00 00 05 68 65 6C 6C 6F   (WRITE "hello")
//! Response: 01 00 00 00 00 00 00 00                  (OK)
//! ```
//!
//! Reading, decoding and validating are separate steps. The [`reader`]
//! performs exactly one read for the header and one for the content and never
//! retries; the [`validate`] step then classifies truncated reads, oversized
//! lengths and type/content mismatches.

pub mod codec;
pub mod reader;
pub mod validate;

use bytes::Bytes;
use std::fmt;

pub use codec::{
    content_length, decode, encode, encode_header, encode_raw, wire_length, RawFrame, HEADER_SIZE,
};
pub use reader::{read_frame, ReadError};
pub use validate::{validate, ValidationError};

/// Largest content length a frame may declare by default.
///
/// Lengths with the high bit set would be negative in a signed 32-bit host
/// integer and are always rejected.
pub const MAX_CONTENT_LENGTH: u32 = i32::MAX as u32;

/// Protocol message type, one byte on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Acknowledgment. Content must be empty.
    Ok = 1,
    /// Append the content plus a newline to the target file.
    Write = 2,
    /// Truncate the target file. Content must be empty.
    Clear = 3,
    /// Error report, content is the description.
    Error = 4,
    /// Liveness check. Content must be empty.
    Ping = 5,
}

impl MessageType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Ok),
            2 => Some(Self::Write),
            3 => Some(Self::Clear),
            4 => Some(Self::Error),
            5 => Some(Self::Ping),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// OK, CLEAR and PING frames carry no content.
    pub fn requires_empty_content(self) -> bool {
        matches!(self, Self::Ok | Self::Clear | Self::Ping)
    }

    /// Whether the receiving side answers this type with a frame of its own.
    pub fn expects_response(self) -> bool {
        matches!(self, Self::Write | Self::Clear | Self::Ping)
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ValidationError;

    fn try_from(v: u8) -> Result<Self, ValidationError> {
        Self::from_u8(v).ok_or(ValidationError::UnknownMessageType(v))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Write => "WRITE",
            Self::Clear => "CLEAR",
            Self::Error => "ERROR",
            Self::Ping => "PING",
        };
        f.write_str(name)
    }
}

/// A validated protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: MessageType,
    pub content: Bytes,
}

impl Frame {
    pub fn new(msg_type: MessageType, content: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            content: content.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(MessageType::Ok, Bytes::new())
    }

    pub fn write(content: impl Into<Bytes>) -> Self {
        Self::new(MessageType::Write, content)
    }

    pub fn clear() -> Self {
        Self::new(MessageType::Clear, Bytes::new())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(MessageType::Error, Bytes::from(message.into()))
    }

    pub fn ping() -> Self {
        Self::new(MessageType::Ping, Bytes::new())
    }

    /// Encode to wire bytes (header followed by content).
    pub fn encode(&self) -> Bytes {
        encode(self.msg_type, &self.content)
    }

    /// Content as text, replacing invalid UTF-8.
    pub fn content_lossy(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Bounds applied while reading and validating frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    /// Declared lengths above this are rejected without reading the content.
    pub max_content_length: u32,
}

impl FrameLimits {
    pub fn new(max_content_length: u32) -> Self {
        Self {
            max_content_length: max_content_length.min(MAX_CONTENT_LENGTH),
        }
    }
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_content_length: MAX_CONTENT_LENGTH,
        }
    }
}
