use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::identity::{FileIdentity, FileStat};

/// File system abstraction consumed by [`crate::FileContentCache`].
///
/// Resolves a path to an identity and modification time (no content read) and reads raw
/// bytes. Both calls are blocking; the cache decides where they run.
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Resolves identity, modification time and size without reading the content.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Reads the file contents as raw bytes.
    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Local OS file system implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = fs::metadata(path)?;
        if meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            ));
        }
        Ok(FileStat {
            identity: FileIdentity::from_metadata(path, &meta),
            mtime: meta.modified()?,
            len: meta.len(),
        })
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}
