use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::fs::FileSystem;
use crate::identity::{FileIdentity, FileStat};

/// An in-memory [`FileSystem`] with inode semantics.
///
/// Paths map to inodes, so [`MemoryFs::link`] produces real aliases (two paths, one
/// identity) and [`MemoryFs::rename`] keeps the identity. Every call is counted so tests can
/// assert how much I/O the cache actually performed.
#[derive(Debug, Default)]
pub struct MemoryFs {
    inner: Mutex<Inner>,
    stats: AtomicUsize,
    reads: AtomicUsize,
}

#[derive(Debug, Default)]
struct Inner {
    paths: HashMap<PathBuf, u64>,
    files: HashMap<u64, MemoryFile>,
    next_inode: u64,
    failing_reads: HashSet<PathBuf>,
    reads_by_path: HashMap<PathBuf, usize>,
}

#[derive(Debug, Clone)]
struct MemoryFile {
    content: Vec<u8>,
    mtime: SystemTime,
}

const DEVICE: u64 = 1;

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or overwrites the file at `path`. Overwriting keeps the inode (and thus every
    /// hard link to it), like an in-place write.
    pub fn write(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>, mtime: SystemTime) {
        let path = path.as_ref().to_path_buf();
        let file = MemoryFile {
            content: content.into(),
            mtime,
        };
        let mut inner = self.inner.lock();
        match inner.paths.get(&path).copied() {
            Some(inode) => {
                inner.files.insert(inode, file);
            }
            None => {
                inner.next_inode += 1;
                let inode = inner.next_inode;
                inner.paths.insert(path, inode);
                inner.files.insert(inode, file);
            }
        }
    }

    /// Adds `new` as a hard link to the file at `existing`.
    pub fn link(&self, existing: impl AsRef<Path>, new: impl AsRef<Path>) -> io::Result<()> {
        let existing = existing.as_ref();
        let mut inner = self.inner.lock();
        let inode = *inner.paths.get(existing).ok_or_else(|| not_found(existing))?;
        inner.paths.insert(new.as_ref().to_path_buf(), inode);
        Ok(())
    }

    /// Moves a path without touching the file it names.
    pub fn rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> io::Result<()> {
        let from = from.as_ref();
        let mut inner = self.inner.lock();
        let inode = inner.paths.remove(from).ok_or_else(|| not_found(from))?;
        inner.paths.insert(to.as_ref().to_path_buf(), inode);
        Ok(())
    }

    /// Unlinks `path`. The file itself survives while other links remain.
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        let mut inner = self.inner.lock();
        let Some(inode) = inner.paths.remove(path.as_ref()) else {
            return false;
        };
        if !inner.paths.values().any(|&other| other == inode) {
            inner.files.remove(&inode);
        }
        true
    }

    pub fn set_mtime(&self, path: impl AsRef<Path>, mtime: SystemTime) -> io::Result<()> {
        let path = path.as_ref();
        let mut inner = self.inner.lock();
        let inode = *inner.paths.get(path).ok_or_else(|| not_found(path))?;
        if let Some(file) = inner.files.get_mut(&inode) {
            file.mtime = mtime;
        }
        Ok(())
    }

    /// Makes every subsequent read of `path` fail while stat keeps succeeding, which models
    /// a file that disappears between stat and read.
    pub fn fail_reads(&self, path: impl AsRef<Path>) {
        self.inner
            .lock()
            .failing_reads
            .insert(path.as_ref().to_path_buf());
    }

    /// Total `read_bytes` calls, successful or not.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// `read_bytes` calls issued for one path.
    pub fn read_count_for(&self, path: impl AsRef<Path>) -> usize {
        self.inner
            .lock()
            .reads_by_path
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    /// Total `stat` calls, successful or not.
    pub fn stat_count(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }
}

impl FileSystem for MemoryFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock();
        let inode = *inner.paths.get(path).ok_or_else(|| not_found(path))?;
        let file = inner.files.get(&inode).ok_or_else(|| not_found(path))?;
        Ok(FileStat {
            identity: FileIdentity::new(DEVICE, inode),
            mtime: file.mtime,
            len: file.content.len() as u64,
        })
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock();
        *inner.reads_by_path.entry(path.to_path_buf()).or_default() += 1;
        if inner.failing_reads.contains(path) {
            return Err(not_found(path));
        }
        let inode = *inner.paths.get(path).ok_or_else(|| not_found(path))?;
        let file = inner.files.get(&inode).ok_or_else(|| not_found(path))?;
        Ok(file.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_share_identity_and_content() {
        let fs = MemoryFs::new();
        let now = SystemTime::now();
        fs.write("/a.go", "package a", now);
        fs.link("/a.go", "/b.go").unwrap();

        let a = fs.stat(Path::new("/a.go")).unwrap();
        let b = fs.stat(Path::new("/b.go")).unwrap();
        assert_eq!(a.identity, b.identity);

        fs.write("/b.go", "package b", now);
        assert_eq!(fs.read_bytes(Path::new("/a.go")).unwrap(), b"package b");
        assert_eq!(fs.read_count(), 1);
        assert_eq!(fs.read_count_for("/a.go"), 1);
        assert_eq!(fs.stat_count(), 2);
    }

    #[test]
    fn remove_keeps_other_links_alive() {
        let fs = MemoryFs::new();
        fs.write("/a.go", "x", SystemTime::now());
        fs.link("/a.go", "/b.go").unwrap();

        assert!(fs.remove("/a.go"));
        assert!(fs.stat(Path::new("/a.go")).is_err());
        assert_eq!(fs.read_bytes(Path::new("/b.go")).unwrap(), b"x");
        assert!(!fs.remove("/a.go"));
    }

    #[test]
    fn rename_preserves_identity() {
        let fs = MemoryFs::new();
        fs.write("/a.go", "x", SystemTime::now());
        let before = fs.stat(Path::new("/a.go")).unwrap().identity;
        fs.rename("/a.go", "/c.go").unwrap();
        assert_eq!(fs.stat(Path::new("/c.go")).unwrap().identity, before);
    }
}
