//! Frame reader.
//!
//! One read call for the header, one for the content, no retries. Whatever a
//! single read returns is recorded in the [`RawFrame`] and judged later by
//! validation; a peer that sends less than it declared produces a short
//! content read rather than a blocked task.

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use super::codec::{content_length, decode, RawFrame, HEADER_SIZE};
use super::FrameLimits;

/// Errors that end reading from a stream.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The peer closed the stream before a header byte arrived.
    #[error("The connection has been closed by the other party")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one raw frame from `stream`.
///
/// The content read is skipped when the header read came up short or the
/// declared length exceeds `limits`; the frame then fails validation and any
/// unread bytes stay on the stream as the start of the next frame.
pub async fn read_frame<R>(stream: &mut R, limits: FrameLimits) -> Result<RawFrame, ReadError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    let header_read = stream.read(&mut header).await?;
    if header_read == 0 {
        return Err(ReadError::ConnectionClosed);
    }

    let declared = content_length(&header[..header_read]);
    let capacity = if header_read == HEADER_SIZE && declared <= limits.max_content_length {
        declared as usize
    } else {
        0
    };

    let mut content = BytesMut::zeroed(capacity);
    let content_read = if capacity > 0 {
        stream.read(&mut content).await?
    } else {
        0
    };
    content.truncate(content_read);

    trace!(
        type_byte = header[0],
        header_read,
        declared,
        content_read,
        "Read frame"
    );

    Ok(decode(&header[..header_read], content.freeze()))
}
