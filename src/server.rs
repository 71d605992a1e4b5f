//! Unix socket listener.
//!
//! Accepts connections indefinitely and runs each one as its own task against
//! the shared [`FileSink`]. There is no connection limit; accept never waits on
//! a handler, and an accept failure is logged without stopping the loop.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::handler::handle_connection;
use crate::protocol::FrameLimits;
use crate::sink::{FileError, FileSink};

/// Errors raised while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to {}: {source}", .path.display())]
    Bind { path: PathBuf, source: io::Error },

    #[error("path {} exists but is not a socket", .0.display())]
    NotASocket(PathBuf),

    #[error("target file {}: {source}", .path.display())]
    TargetFile { path: PathBuf, source: FileError },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Server instance
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    sink: Arc<FileSink>,
    limits: FrameLimits,
}

impl Server {
    /// Check the target file, remove a stale socket and bind the listener.
    pub fn bind(config: &Config) -> Result<Self, ServerError> {
        let sink = Arc::new(FileSink::new(&config.file_path));
        sink.prepare().map_err(|source| ServerError::TargetFile {
            path: config.file_path.clone(),
            source,
        })?;

        remove_stale_socket(&config.socket_path)?;

        let listener =
            UnixListener::bind(&config.socket_path).map_err(|source| ServerError::Bind {
                path: config.socket_path.clone(),
                source,
            })?;

        info!(
            socket = %config.socket_path.display(),
            file = %config.file_path.display(),
            max_content_length = config.max_content_length,
            "Server listening"
        );

        Ok(Server {
            socket_path: config.socket_path.clone(),
            listener,
            sink,
            limits: FrameLimits::new(config.max_content_length),
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn sink(&self) -> &Arc<FileSink> {
        &self.sink
    }

    /// Accept connections until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("New connection");

                    let sink = Arc::clone(&self.sink);
                    let limits = self.limits;

                    tokio::spawn(async move {
                        match handle_connection(stream, sink, limits).await {
                            Ok(()) => debug!("Connection closed"),
                            Err(e) => debug!(error = %e, "Connection error"),
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(error = %e, "Failed to remove socket file");
            }
        }
    }
}

/// Remove a leftover socket file; refuse to touch anything else.
fn remove_stale_socket(path: &Path) -> Result<(), ServerError> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if !metadata.file_type().is_socket() {
            return Err(ServerError::NotASocket(path.to_path_buf()));
        }
    }

    std::fs::remove_file(path)?;
    debug!(path = %path.display(), "Removed stale socket file");
    Ok(())
}
