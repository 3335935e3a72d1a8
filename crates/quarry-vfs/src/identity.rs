use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

/// Path-independent identity of a file on disk.
///
/// On Unix this is the `(device, inode)` pair, which is stable across renames and shared
/// by hard links. Other platforms fall back to a hash of the canonicalized path, which
/// still deduplicates symlinks but not hard links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileIdentity {
    device: u64,
    inode: u64,
}

impl FileIdentity {
    pub const fn new(device: u64, inode: u64) -> Self {
        Self { device, inode }
    }

    pub fn device(&self) -> u64 {
        self.device
    }

    pub fn inode(&self) -> u64 {
        self.inode
    }

    #[cfg(unix)]
    pub(crate) fn from_metadata(_path: &Path, meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self::new(meta.dev(), meta.ino())
    }

    #[cfg(not(unix))]
    pub(crate) fn from_metadata(path: &Path, _meta: &Metadata) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut hasher = DefaultHasher::new();
        canonical.hash(&mut hasher);
        Self::new(0, hasher.finish())
    }
}

/// Result of resolving a path without reading its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub identity: FileIdentity,
    pub mtime: SystemTime,
    pub len: u64,
}
