//! Sender side of the protocol.
//!
//! A thin wrapper over a Unix stream used by the interactive client binary
//! and by tests. Responses are read and validated with the same reader and
//! validator the server uses.

use std::io;
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tracing::{debug, trace};

use crate::protocol::{
    read_frame, validate, wire_length, Frame, FrameLimits, ReadError, ValidationError,
};

/// Client-side failures.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("The connection has been closed by the other party")]
    ConnectionClosed,

    #[error("Content of {0} bytes does not fit in a frame")]
    ContentTooLong(usize),

    #[error("Validation of the server response failed: {0}")]
    InvalidResponse(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<ReadError> for ClientError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::ConnectionClosed => ClientError::ConnectionClosed,
            ReadError::Io(e) => ClientError::Io(e),
        }
    }
}

/// A connection to a remote-edit server.
pub struct Client {
    stream: UnixStream,
    limits: FrameLimits,
}

impl Client {
    pub async fn connect(socket_path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = socket_path.as_ref();
        let stream = UnixStream::connect(path).await?;
        debug!(socket = %path.display(), "Connected to server");
        Ok(Self {
            stream,
            limits: FrameLimits::default(),
        })
    }

    /// Send a frame and, for types that get an answer, wait for it.
    pub async fn send(&mut self, frame: &Frame) -> Result<Option<Frame>, ClientError> {
        check_frameable(frame)?;
        self.send_raw(&frame.encode()).await?;
        trace!(msg_type = %frame.msg_type, "Frame sent");

        if frame.msg_type.expects_response() {
            self.receive().await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Write bytes as-is, well-formed or not.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.stream.write_all(bytes).await?;
        Ok(())
    }

    /// Read and validate one frame from the server.
    pub async fn receive(&mut self) -> Result<Frame, ClientError> {
        let raw = read_frame(&mut self.stream, self.limits).await?;
        Ok(validate(raw, self.limits)?)
    }

    /// Close the write half, signalling end of stream to the server.
    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Reject content whose length the header cannot carry.
fn check_frameable(frame: &Frame) -> Result<(), ClientError> {
    match wire_length(frame.content.len()) {
        Some(_) => Ok(()),
        None => Err(ClientError::ContentTooLong(frame.content.len())),
    }
}
