use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use quarry_core::{ContentHash, FileKind, FileUri};
use tokio_util::sync::CancellationToken;

use crate::edit::{apply_changes, ContentChange};
use crate::error::{Cancelled, FileError, OverlayError};
use crate::file_cache::FileContentCache;
use crate::handle::{Handle, HandleIdentity};

/// In-memory content for one open document.
///
/// Records are immutable: every edit or save produces a new record that replaces the old
/// one in the [`OverlayStore`], so a record handed to the analyzer never changes under it.
#[derive(Debug, Clone)]
pub struct OverlayRecord {
    uri: FileUri,
    text: Arc<str>,
    hash: ContentHash,
    version: i32,
    kind: FileKind,
    saved: bool,
}

impl OverlayRecord {
    pub fn new(uri: FileUri, text: impl Into<Arc<str>>, version: i32, kind: FileKind) -> Self {
        let text = text.into();
        Self {
            uri,
            hash: ContentHash::of(text.as_bytes()),
            text,
            version,
            kind,
            saved: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    /// Whether the editor has reported this exact content as written to disk.
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    fn with_text(&self, text: String, version: i32) -> Self {
        Self::new(self.uri.clone(), text, version, self.kind)
    }

    fn with_uri(&self, uri: FileUri) -> Self {
        Self {
            uri,
            ..self.clone()
        }
    }
}

impl Handle for OverlayRecord {
    fn uri(&self) -> &FileUri {
        &self.uri
    }

    fn kind(&self) -> FileKind {
        self.kind
    }

    fn content(&self) -> Result<Arc<[u8]>, FileError> {
        Ok(Arc::<[u8]>::from(Arc::clone(&self.text)))
    }

    fn identity(&self) -> HandleIdentity {
        HandleIdentity {
            uri: self.uri.clone(),
            hash: self.hash,
        }
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn same_contents_on_disk(&self) -> bool {
        self.saved
    }
}

/// A file source that serves in-memory overlays before delegating to a
/// [`FileContentCache`].
///
/// The store only keeps the current uri → overlay mapping; when documents open, change or
/// close is decided by whoever drives the editor protocol.
#[derive(Debug)]
pub struct OverlayStore {
    files: Arc<FileContentCache>,
    overlays: Mutex<HashMap<FileUri, Arc<OverlayRecord>>>,
}

impl OverlayStore {
    pub fn new(files: Arc<FileContentCache>) -> Self {
        Self {
            files,
            overlays: Mutex::new(HashMap::new()),
        }
    }

    pub fn file_cache(&self) -> &Arc<FileContentCache> {
        &self.files
    }

    /// Returns the overlay for `uri` if one is open, otherwise the disk content.
    ///
    /// Overlay hits perform no I/O and never consult the file cache.
    pub async fn read_file(
        &self,
        cancel: &CancellationToken,
        uri: &FileUri,
    ) -> Result<Arc<dyn Handle>, Cancelled> {
        if let Some(overlay) = self.overlay(uri) {
            return Ok(overlay);
        }
        let record = self.files.read_file(cancel, uri).await?;
        Ok(Arc::new(record))
    }

    pub fn overlay(&self, uri: &FileUri) -> Option<Arc<OverlayRecord>> {
        self.overlays.lock().get(uri).cloned()
    }

    /// Unordered copy of every open overlay.
    pub fn overlays(&self) -> Vec<Arc<OverlayRecord>> {
        self.overlays.lock().values().cloned().collect()
    }

    pub fn is_open(&self, uri: &FileUri) -> bool {
        self.overlays.lock().contains_key(uri)
    }

    /// Opens (or re-opens) a document, replacing any existing overlay for `uri`.
    pub fn open(
        &self,
        uri: FileUri,
        text: impl Into<Arc<str>>,
        version: i32,
        kind: FileKind,
    ) -> Arc<OverlayRecord> {
        let record = Arc::new(OverlayRecord::new(uri.clone(), text, version, kind));
        tracing::debug!(target = "quarry.vfs", uri = %uri, version, "opened overlay");
        self.overlays.lock().insert(uri, Arc::clone(&record));
        record
    }

    /// Applies editor changes and replaces the overlay with the result.
    ///
    /// `version` must be newer than the current overlay's version.
    pub fn change(
        &self,
        uri: &FileUri,
        version: i32,
        changes: &[ContentChange],
    ) -> Result<Arc<OverlayRecord>, OverlayError> {
        let mut overlays = self.overlays.lock();
        let current = overlays.get(uri).ok_or(OverlayError::NotOpen)?;
        if version <= current.version {
            return Err(OverlayError::StaleVersion {
                current: current.version,
                requested: version,
            });
        }

        let text = apply_changes(current.text(), changes)?;
        let record = Arc::new(current.with_text(text, version));
        overlays.insert(uri.clone(), Arc::clone(&record));
        Ok(record)
    }

    /// Marks the current overlay content as written to disk.
    pub fn save(&self, uri: &FileUri) -> Result<Arc<OverlayRecord>, OverlayError> {
        let mut overlays = self.overlays.lock();
        let current = overlays.get(uri).ok_or(OverlayError::NotOpen)?;
        let record = Arc::new(OverlayRecord {
            saved: true,
            ..OverlayRecord::clone(current)
        });
        overlays.insert(uri.clone(), Arc::clone(&record));
        Ok(record)
    }

    /// Drops the overlay for `uri`; later reads fall through to disk.
    pub fn close(&self, uri: &FileUri) -> bool {
        let removed = self.overlays.lock().remove(uri).is_some();
        if removed {
            tracing::debug!(target = "quarry.vfs", uri = %uri, "closed overlay");
        }
        removed
    }

    /// Moves an open overlay from `from` to `to`.
    ///
    /// Returns `false` (and changes nothing) if `from` is not open or `to` already is.
    pub fn rename(&self, from: &FileUri, to: FileUri) -> bool {
        if from == &to {
            return false;
        }

        let mut overlays = self.overlays.lock();
        if overlays.contains_key(&to) {
            return false;
        }
        let Some(record) = overlays.remove(from) else {
            return false;
        };
        overlays.insert(to.clone(), Arc::new(record.with_uri(to)));
        true
    }

    /// Best-effort count of overlay text bytes held in memory.
    pub fn estimated_bytes(&self) -> usize {
        self.overlays
            .lock()
            .values()
            .map(|record| record.text.len())
            .fold(0usize, usize::saturating_add)
    }
}
