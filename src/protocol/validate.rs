//! Frame validation.
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. the header read was complete
//! 2. the declared length is within limits
//! 3. the content read delivered the declared length
//! 4. the type byte is known and its content rule holds

use thiserror::Error;

use super::codec::{RawFrame, HEADER_SIZE};
use super::{Frame, FrameLimits, MessageType};

/// Reasons a raw frame is not a valid protocol message.
///
/// The display text is what gets sent back to the peer in an ERROR frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The message is too short to include a header")]
    MessageTooShort,

    #[error("The content length specified in the header is greater than the actual content length")]
    ContentTooShort,

    #[error("The content length specified in the header exceeds the maximum of {max} bytes")]
    ContentTooLong { declared: u32, max: u32 },

    #[error("The content of messages with type {0} must be empty!")]
    ContentNotEmpty(MessageType),

    #[error("The type of this message is unknown")]
    UnknownMessageType(u8),
}

/// Decide whether `raw` is a well-formed message.
pub fn validate(raw: RawFrame, limits: FrameLimits) -> Result<Frame, ValidationError> {
    if raw.header_bytes_read < HEADER_SIZE {
        return Err(ValidationError::MessageTooShort);
    }

    if raw.declared_length > limits.max_content_length {
        return Err(ValidationError::ContentTooLong {
            declared: raw.declared_length,
            max: limits.max_content_length,
        });
    }

    let declared = raw.declared_length as usize;
    if raw.content_bytes_read < declared {
        return Err(ValidationError::ContentTooShort);
    }

    let msg_type = MessageType::try_from(raw.type_byte)?;
    if msg_type.requires_empty_content() && declared != 0 {
        return Err(ValidationError::ContentNotEmpty(msg_type));
    }

    Ok(Frame {
        msg_type,
        content: raw.content.slice(..declared),
    })
}
