//! Per-connection request/response loop.
//!
//! Each accepted connection runs `read -> validate -> act -> respond` until the
//! peer closes the stream. Malformed frames and file failures are answered
//! with an ERROR frame and the loop continues; only a transport failure ends
//! the connection early.

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, trace, warn};

use crate::protocol::{read_frame, validate, Frame, FrameLimits, MessageType, ReadError};
use crate::sink::FileSink;

/// Handle one client connection.
///
/// Returns `Ok(())` when the peer closes the stream, or the transport error
/// that ended the connection.
pub async fn handle_connection<S>(
    mut stream: S,
    sink: Arc<FileSink>,
    limits: FrameLimits,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let raw = match read_frame(&mut stream, limits).await {
            Ok(raw) => raw,
            Err(ReadError::ConnectionClosed) => {
                trace!("Connection closed by client");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let response = match validate(raw, limits) {
            Ok(frame) => {
                trace!(msg_type = %frame.msg_type, len = frame.content.len(), "Processing frame");
                run_blocking(|| process(&frame, &sink))
            }
            Err(e) => {
                warn!(error = %e, "Validation of the message failed");
                Some(Frame::error(e.to_string()))
            }
        };

        if let Some(response) = response {
            stream.write_all(&response.encode()).await?;
            trace!(msg_type = %response.msg_type, "Response sent");
        }
    }
}

/// Run blocking file work without stalling other connections on the same
/// worker. `block_in_place` is unavailable on a current-thread runtime, where
/// the work runs inline.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Act on a validated frame and return the response to send, if any.
pub fn process(frame: &Frame, sink: &FileSink) -> Option<Frame> {
    match frame.msg_type {
        MessageType::Ok => None,

        MessageType::Write => Some(match sink.append_line(&frame.content) {
            Ok(()) => Frame::ok(),
            Err(e) => {
                warn!(error = %e, "Write to target file failed");
                Frame::error(e.to_string())
            }
        }),

        MessageType::Clear => Some(match sink.clear() {
            Ok(()) => Frame::ok(),
            Err(e) => {
                warn!(error = %e, "Clearing target file failed");
                Frame::error(e.to_string())
            }
        }),

        MessageType::Error => {
            warn!(message = %frame.content_lossy(), "Received ERROR from client");
            None
        }

        MessageType::Ping => {
            debug!("Received PING");
            Some(Frame::ok())
        }
    }
}
