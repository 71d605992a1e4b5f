//! Shared target file.
//!
//! All connections write through one [`FileSink`]. Each write takes the sink's
//! lock, re-checks the file and then performs a single write call, so lines
//! from concurrent WRITEs never interleave and a CLEAR never lands in the
//! middle of an append.
//!
//! The file is never cached open. It may be deleted or have its permissions
//! changed while the server runs:
//! - missing: it is created again
//! - not a regular file: [`FileError::NotRegular`]
//! - not writable by this process: [`FileError::NotWritable`]

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Target file failures, reported to peers as ERROR content.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("The file is not regular")]
    NotRegular,

    #[error("The file cannot be written to")]
    NotWritable,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Serialized writer for the single target file.
pub struct FileSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!(path = %path.display(), "Initializing file sink");
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the file checks once, creating the file if needed.
    ///
    /// Used at startup so an unusable path fails before the listener binds.
    pub fn prepare(&self) -> Result<(), FileError> {
        let _guard = self.lock();
        self.check()?;
        self.open(OpenOptions::new().write(true))?;
        Ok(())
    }

    /// Append `content` plus a newline, or truncate the file when
    /// `append` is false (content is ignored).
    pub fn write(&self, content: &[u8], append: bool) -> Result<(), FileError> {
        let _guard = self.lock();
        self.check()?;

        if append {
            let mut line = Vec::with_capacity(content.len() + 1);
            line.extend_from_slice(content);
            line.push(b'\n');

            let mut file = self.open(OpenOptions::new().append(true))?;
            file.write_all(&line)?;
            trace!(bytes = line.len(), "Appended line");
        } else {
            self.open(OpenOptions::new().write(true).truncate(true))?;
            trace!("Truncated file");
        }

        Ok(())
    }

    pub fn append_line(&self, content: &[u8]) -> Result<(), FileError> {
        self.write(content, true)
    }

    pub fn clear(&self) -> Result<(), FileError> {
        self.write(&[], false)
    }

    /// Exclusive access to the target file.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open for writing as the running process. Refused access is
    /// `NotWritable`, whatever the permission bits say.
    fn open(&self, options: &OpenOptions) -> Result<File, FileError> {
        options.open(&self.path).map_err(open_error)
    }

    /// Caller must hold the lock.
    fn check(&self) -> Result<(), FileError> {
        match fs::metadata(&self.path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(&self.path)?;
                debug!(path = %self.path.display(), "Created missing target file");
            }
            Err(e) => return Err(e.into()),
        }

        if !fs::metadata(&self.path)?.is_file() {
            return Err(FileError::NotRegular);
        }
        Ok(())
    }
}

fn open_error(e: io::Error) -> FileError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => FileError::NotWritable,
        _ => FileError::Io(e),
    }
}
