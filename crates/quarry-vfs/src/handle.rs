use std::fmt;
use std::sync::Arc;

use quarry_core::{ContentHash, FileKind, FileUri};

use crate::error::FileError;

/// The `(uri, content hash)` pair that identifies one version of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleIdentity {
    pub uri: FileUri,
    pub hash: ContentHash,
}

impl fmt::Display for HandleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.uri, self.hash.short())
    }
}

/// Capabilities shared by disk-backed [`crate::FileRecord`]s and in-memory
/// [`crate::OverlayRecord`]s. This is what the analyzer consumes.
pub trait Handle: Send + Sync + fmt::Debug {
    fn uri(&self) -> &FileUri;

    fn kind(&self) -> FileKind;

    /// The file's bytes, or the error that prevented reading them.
    fn content(&self) -> Result<Arc<[u8]>, FileError>;

    fn identity(&self) -> HandleIdentity;

    /// Editor version for overlays; always `0` for disk files.
    fn version(&self) -> i32;

    /// Whether this content is known to match what is on disk.
    fn same_contents_on_disk(&self) -> bool;
}
