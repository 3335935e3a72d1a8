//! Memoized file source for Quarry.
//!
//! The VFS is responsible for:
//! - Reading files from the OS file system through a bounded I/O gate ([`IoLimiter`]).
//! - Caching read results keyed by on-disk identity rather than path, so hard links and
//!   other aliases share a single read ([`FileContentCache`]).
//! - Providing in-memory overlays (editor buffers) that take precedence over disk
//!   ([`OverlayStore`]).
//! - Exposing both kinds of file through one capability trait ([`Handle`]).
//!
//! Cancellation is cooperative via [`CancellationToken`] and always surfaces as
//! [`Cancelled`], never as a file error.

mod clock;
mod edit;
mod error;
mod file_cache;
mod fs;
mod handle;
mod identity;
mod limiter;
mod memory_fs;
mod overlay;

pub use clock::{Clock, ManualClock, SystemClock};
pub use edit::ContentChange;
pub use error::{Cancelled, FileError, OverlayError};
pub use file_cache::{FileCacheStats, FileContentCache, FileRecord};
pub use fs::{FileSystem, LocalFs};
pub use handle::{Handle, HandleIdentity};
pub use identity::{FileIdentity, FileStat};
pub use limiter::{IoLimiter, IoPermit};
pub use memory_fs::MemoryFs;
pub use overlay::{OverlayRecord, OverlayStore};

pub use quarry_core::{ContentHash, FileKind, FileUri};
pub use tokio_util::sync::CancellationToken;
