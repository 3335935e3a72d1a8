use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::FileKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    #[error("path is not absolute: {}", .0.display())]
    NotAbsolute(PathBuf),
    #[error("invalid URI {uri}: {reason}")]
    Invalid { uri: String, reason: String },
}

/// A canonical document URI.
///
/// `file:` URIs are always produced from a lexically normalized absolute path, so the
/// same file spelled two different ways (`/a/./b.go`, `file:///a/b.go`) maps to one
/// `FileUri`. Note that distinct *paths* for the same file (hard links, symlinks)
/// still produce distinct URIs; deduplicating those is the file cache's job.
///
/// Cloning is cheap (the string is reference counted).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileUri(Arc<str>);

impl FileUri {
    /// Builds a `file:` URI from an absolute local path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UriError> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return Err(UriError::NotAbsolute(path.to_path_buf()));
        }
        let normalized = normalize_local_path(path);
        let url = Url::from_file_path(&normalized)
            .map_err(|()| UriError::NotAbsolute(path.to_path_buf()))?;
        Ok(Self(Arc::from(url.as_str())))
    }

    /// Parses a URI string. `file:` URIs are normalized the same way as [`FileUri::from_path`].
    pub fn parse(text: &str) -> Result<Self, UriError> {
        let url = Url::parse(text).map_err(|err| UriError::Invalid {
            uri: text.to_string(),
            reason: err.to_string(),
        })?;
        if url.scheme() == "file" {
            if let Ok(path) = url.to_file_path() {
                return Self::from_path(path);
            }
        }
        Ok(Self(Arc::from(url.as_str())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_file(&self) -> bool {
        self.0.starts_with("file:")
    }

    /// Returns the local path for a `file:` URI.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if !self.is_file() {
            return None;
        }
        Url::parse(&self.0).ok()?.to_file_path().ok()
    }

    /// The last path segment (still percent-encoded).
    pub fn file_name(&self) -> &str {
        let trimmed = self.0.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_file_name(self.file_name())
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl Serialize for FileUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FileUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        FileUri::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Lexically normalizes a local path: drops `.` segments, folds `..` (clamped at the
/// root) and collapses redundant separators. Does not touch the file system.
fn normalize_local_path(path: &Path) -> PathBuf {
    let mut prefix: Option<OsString> = None;
    let mut has_root = false;
    let mut stack: Vec<OsString> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix_component) => {
                prefix = Some(prefix_component.as_os_str().to_owned());
            }
            Component::RootDir => has_root = true,
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(last) = stack.last() {
                    if last != ".." {
                        stack.pop();
                        continue;
                    }
                }
                if !has_root {
                    stack.push(OsString::from(".."));
                }
            }
            Component::Normal(segment) => stack.push(segment.to_owned()),
        }
    }

    let mut out = PathBuf::new();
    match (prefix, has_root) {
        (Some(mut prefix), true) => {
            prefix.push(std::path::MAIN_SEPARATOR.to_string());
            out.push(prefix);
        }
        (Some(prefix), false) => out.push(prefix),
        (None, true) => out.push(std::path::MAIN_SEPARATOR.to_string()),
        (None, false) => {}
    }
    out.extend(stack);
    out
}
