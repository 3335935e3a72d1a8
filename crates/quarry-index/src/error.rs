use quarry_core::FileUri;

use crate::model::PackageId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("{uri} is not part of package {package}")]
    FileNotInPackage { package: PackageId, uri: FileUri },
}
