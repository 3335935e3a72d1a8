//! Core shared value types for Quarry.
//!
//! File URIs, content hashes, file kinds and LSP-style text positions, shared
//! between the VFS and the package index layers.

mod hash;
mod kind;
mod text;
mod uri;

pub use hash::ContentHash;
pub use kind::FileKind;
pub use text::{Position, Range};
pub use uri::{FileUri, UriError};
