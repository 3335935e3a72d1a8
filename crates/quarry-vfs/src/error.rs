use std::io;
use std::sync::Arc;

/// Returned when a caller's [`crate::CancellationToken`] fires while the operation is
/// still waiting (e.g. for an I/O slot).
///
/// A cancelled read says nothing about the file: it is never cached and never reported as a
/// [`FileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// A per-file failure carried inside a [`crate::FileRecord`].
///
/// The `io::Error` is reference counted so that records (and their aliases) stay cheap to
/// clone.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FileError {
    /// Identity/mtime resolution failed (missing file, permissions, not a local URI, ...).
    #[error("stat failed: {0}")]
    Stat(#[source] Arc<io::Error>),
    /// Identity resolved but reading the bytes failed (e.g. removed between stat and read).
    #[error("read failed: {0}")]
    Read(#[source] Arc<io::Error>),
}

impl FileError {
    pub fn stat(err: io::Error) -> Self {
        FileError::Stat(Arc::new(err))
    }

    pub fn read(err: io::Error) -> Self {
        FileError::Read(Arc::new(err))
    }

    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            FileError::Stat(err) | FileError::Read(err) => err.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.io_kind() == io::ErrorKind::NotFound
    }
}

/// Errors produced when applying editor events to the overlay store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverlayError {
    #[error("document not open")]
    NotOpen,
    #[error("invalid range")]
    InvalidRange,
    #[error("stale document version {requested} (current version is {current})")]
    StaleVersion { current: i32, requested: i32 },
}
