use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use quarry_core::{ContentHash, FileKind, FileUri};
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::error::{Cancelled, FileError};
use crate::fs::FileSystem;
use crate::handle::{Handle, HandleIdentity};
use crate::identity::{FileIdentity, FileStat};
use crate::limiter::IoLimiter;

/// The immutable result of one disk read, shared by every alias of the file.
#[derive(Debug)]
struct FilePayload {
    mod_time: SystemTime,
    content: Option<Arc<[u8]>>,
    hash: ContentHash,
    error: Option<FileError>,
}

/// A disk-backed file as observed at one point in time.
///
/// Cloning is cheap. Records produced for different aliases of the same file share one
/// payload and differ only in [`Handle::uri`].
#[derive(Debug, Clone)]
pub struct FileRecord {
    uri: FileUri,
    payload: Arc<FilePayload>,
}

impl FileRecord {
    fn read(uri: FileUri, mod_time: SystemTime, result: io::Result<Vec<u8>>) -> Self {
        let payload = match result {
            Ok(bytes) => FilePayload {
                mod_time,
                hash: ContentHash::of(&bytes),
                content: Some(Arc::from(bytes)),
                error: None,
            },
            Err(err) => FilePayload {
                mod_time,
                content: None,
                hash: ContentHash::empty(),
                error: Some(FileError::read(err)),
            },
        };
        Self {
            uri,
            payload: Arc::new(payload),
        }
    }

    fn stat_failure(uri: FileUri, err: io::Error) -> Self {
        Self {
            uri,
            payload: Arc::new(FilePayload {
                mod_time: SystemTime::UNIX_EPOCH,
                content: None,
                hash: ContentHash::empty(),
                error: Some(FileError::stat(err)),
            }),
        }
    }

    fn with_uri(&self, uri: FileUri) -> Self {
        Self {
            uri,
            payload: Arc::clone(&self.payload),
        }
    }

    /// Modification time observed when the record was built (`UNIX_EPOCH` for stat failures).
    pub fn mod_time(&self) -> SystemTime {
        self.payload.mod_time
    }

    pub fn hash(&self) -> ContentHash {
        self.payload.hash
    }

    pub fn error(&self) -> Option<&FileError> {
        self.payload.error.as_ref()
    }

    pub fn content_len(&self) -> usize {
        self.payload.content.as_ref().map_or(0, |bytes| bytes.len())
    }

    /// Whether `self` and `other` were produced by the same read.
    pub fn shares_payload_with(&self, other: &FileRecord) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl Handle for FileRecord {
    fn uri(&self) -> &FileUri {
        &self.uri
    }

    fn kind(&self) -> FileKind {
        self.uri.kind()
    }

    fn content(&self) -> Result<Arc<[u8]>, FileError> {
        if let Some(err) = &self.payload.error {
            return Err(err.clone());
        }
        Ok(self
            .payload
            .content
            .clone()
            .unwrap_or_else(|| Arc::from(Vec::new())))
    }

    fn identity(&self) -> HandleIdentity {
        HandleIdentity {
            uri: self.uri.clone(),
            hash: self.payload.hash,
        }
    }

    fn version(&self) -> i32 {
        0
    }

    fn same_contents_on_disk(&self) -> bool {
        true
    }
}

/// Coarse cache statistics for diagnostics. Never used for correctness decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCacheStats {
    /// Distinct on-disk identities currently cached.
    pub identities: usize,
    /// Cached URIs across all identities (at least `identities`).
    pub aliases: usize,
    /// Size of the largest cached content, in bytes.
    pub largest_content_bytes: usize,
    /// Cached entries that carry a read error instead of content.
    pub error_entries: usize,
}

/// Identity-keyed cache of file reads.
///
/// Entries are keyed by [`FileIdentity`], never by URI, so every alias of a file shares one
/// read. A read is only kept if the file's mtime was at least `freshness_window` old when
/// it was observed: mtime granularity cannot tell a just-written file from one that is
/// about to be written again, so young files are served once and then forgotten.
///
/// Stat failures are never cached; every call for a missing file re-resolves it.
#[derive(Debug)]
pub struct FileContentCache {
    fs: Arc<dyn FileSystem>,
    limiter: IoLimiter,
    clock: Arc<dyn Clock>,
    freshness_window: Duration,
    entries: Mutex<HashMap<FileIdentity, Vec<FileRecord>>>,
}

impl FileContentCache {
    /// Default age below which a file's mtime is considered too recent to trust.
    pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(2);

    pub fn new(fs: Arc<dyn FileSystem>, limiter: IoLimiter) -> Self {
        Self {
            fs,
            limiter,
            clock: Arc::new(SystemClock),
            freshness_window: Self::DEFAULT_FRESHNESS_WINDOW,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn limiter(&self) -> &IoLimiter {
        &self.limiter
    }

    /// Returns the current content of `uri`.
    ///
    /// Stat and read failures are reported inside the returned record; the only `Err` is
    /// [`Cancelled`], returned when `cancel` fires while waiting for an I/O slot. A cancelled
    /// read leaves the cache untouched.
    pub async fn read_file(
        &self,
        cancel: &CancellationToken,
        uri: &FileUri,
    ) -> Result<FileRecord, Cancelled> {
        let Some(path) = uri.to_file_path() else {
            let err = io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a local file URI: {uri}"),
            );
            return Ok(FileRecord::stat_failure(uri.clone(), err));
        };

        let stat = match self.fs.stat(&path) {
            Ok(stat) => stat,
            Err(err) => {
                tracing::debug!(
                    target = "quarry.vfs",
                    uri = %uri,
                    error = %err,
                    "stat failed; not caching"
                );
                return Ok(FileRecord::stat_failure(uri.clone(), err));
            }
        };
        // Captured before any locking so that time spent waiting cannot make a young file
        // look old enough to cache.
        let recently_modified = self.is_recent(stat.mtime);

        if let Some(hit) = self.lookup(uri, &stat) {
            return Ok(hit);
        }

        let record = self.read_through(cancel, uri, &path, stat.mtime).await?;
        self.store(stat.identity, &record, recently_modified);
        Ok(record)
    }

    /// Snapshot of the cache's size. O(number of cached identities).
    pub fn stats(&self) -> FileCacheStats {
        let entries = self.entries.lock();
        let mut stats = FileCacheStats {
            identities: entries.len(),
            ..FileCacheStats::default()
        };
        for aliases in entries.values() {
            stats.aliases += aliases.len();
            let Some(representative) = aliases.first() else {
                continue;
            };
            stats.largest_content_bytes =
                stats.largest_content_bytes.max(representative.content_len());
            if representative.error().is_some() {
                stats.error_entries += 1;
            }
        }
        stats
    }

    fn is_recent(&self, mtime: SystemTime) -> bool {
        match self.clock.now().duration_since(mtime) {
            Ok(age) => age < self.freshness_window,
            // mtime in the future: certainly not settled.
            Err(_) => true,
        }
    }

    fn lookup(&self, uri: &FileUri, stat: &FileStat) -> Option<FileRecord> {
        let mut entries = self.entries.lock();
        let aliases = entries.get_mut(&stat.identity)?;
        let representative = aliases.first()?;
        if representative.mod_time() != stat.mtime {
            return None;
        }

        if let Some(existing) = aliases.iter().find(|record| &record.uri == uri) {
            return Some(existing.clone());
        }

        let alias = representative.with_uri(uri.clone());
        aliases.push(alias.clone());
        Some(alias)
    }

    async fn read_through(
        &self,
        cancel: &CancellationToken,
        uri: &FileUri,
        path: &Path,
        mod_time: SystemTime,
    ) -> Result<FileRecord, Cancelled> {
        let permit = self.limiter.acquire(cancel).await?;

        let fs = Arc::clone(&self.fs);
        let path = path.to_path_buf();
        let joined = tokio::task::spawn_blocking(move || {
            // Held for the duration of the read; dropped on return or unwind.
            let _permit = permit;
            fs.read_bytes(&path)
        })
        .await;

        let result = match joined {
            Ok(result) => result,
            Err(join_err) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("read task failed: {join_err}"),
            )),
        };
        if let Err(err) = &result {
            tracing::debug!(target = "quarry.vfs", uri = %uri, error = %err, "read failed");
        }

        let record = FileRecord::read(uri.clone(), mod_time, result);
        tracing::debug!(
            target = "quarry.vfs",
            uri = %uri,
            hash = %record.hash().short(),
            bytes = record.content_len(),
            "read file"
        );
        Ok(record)
    }

    fn store(&self, identity: FileIdentity, record: &FileRecord, recently_modified: bool) {
        let mut entries = self.entries.lock();
        if recently_modified {
            if entries.remove(&identity).is_some() {
                tracing::debug!(
                    target = "quarry.vfs",
                    uri = %record.uri,
                    "evicted recently modified file"
                );
            }
        } else {
            // Any previous aliases were observed at a different mtime and are stale.
            entries.insert(identity, vec![record.clone()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::clock::ManualClock;
    use crate::memory_fs::MemoryFs;

    fn t0() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000)
    }

    fn uri(path: &str) -> FileUri {
        FileUri::from_path(path).unwrap()
    }

    fn cache(fs: &Arc<MemoryFs>, clock: &Arc<ManualClock>) -> FileContentCache {
        FileContentCache::new(fs.clone(), IoLimiter::new(4)).with_clock(clock.clone())
    }

    #[tokio::test]
    async fn repeated_alias_lookup_returns_existing_record() {
        let fs = Arc::new(MemoryFs::new());
        let clock = Arc::new(ManualClock::new(t0()));
        fs.write("/a.go", "package a", t0() - Duration::from_secs(10));
        fs.link("/a.go", "/b.go").unwrap();
        let cache = cache(&fs, &clock);
        let cancel = CancellationToken::new();

        cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
        cache.read_file(&cancel, &uri("/b.go")).await.unwrap();
        cache.read_file(&cancel, &uri("/b.go")).await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.identities, 1);
        assert_eq!(stats.aliases, 2);
        assert_eq!(fs.read_count(), 1);
    }

    #[tokio::test]
    async fn future_mtime_is_treated_as_recent() {
        let fs = Arc::new(MemoryFs::new());
        let clock = Arc::new(ManualClock::new(t0()));
        fs.write("/a.go", "package a", t0() + Duration::from_secs(60));
        let cache = cache(&fs, &clock);

        cache
            .read_file(&CancellationToken::new(), &uri("/a.go"))
            .await
            .unwrap();
        assert_eq!(cache.stats().identities, 0);
    }

    #[tokio::test]
    async fn non_file_uri_is_a_stat_failure() {
        let fs = Arc::new(MemoryFs::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let cache = cache(&fs, &clock);

        let untitled = FileUri::parse("untitled:Untitled-1").unwrap();
        let record = cache
            .read_file(&CancellationToken::new(), &untitled)
            .await
            .unwrap();
        assert!(matches!(record.error(), Some(FileError::Stat(_))));
        assert_eq!(fs.stat_count(), 0);
    }
}
