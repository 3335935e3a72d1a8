//! Per-package analysis results and the derived indices built lazily on top of them.
//!
//! An [`Analyzer`] turns a package's file handles into an [`AnalysisOutput`]. The output is
//! frozen into a [`PackageSnapshot`]; the cross-reference, method-set and test indices are
//! computed from it on first request, at most once per snapshot.

mod error;
mod indexes;
mod lazy;
mod model;
mod package;
mod snapshot;

pub use error::LookupError;
pub use indexes::{MethodSetIndex, MethodSetKey, TestFunction, TestIndex, TestKind, XrefIndex};
pub use lazy::LazyIndex;
pub use model::{
    AnalysisOutput, Decl, DeclKind, Diagnostic, DiagnosticSource, ImportMap, Location, MethodSig,
    NamedType, PackageId, ParsedFile, Reference, Severity, TypeInfo, TypeKind, TypeTable,
};
pub use package::{Analyzer, Package, PackageMetadata};
pub use snapshot::{IndexesBuilt, PackageIndexCache, PackageSnapshot};
