use std::collections::BTreeMap;
use std::sync::Arc;

use quarry_core::FileUri;
use quarry_vfs::{Cancelled, CancellationToken, Handle, OverlayRecord, OverlayStore};

use crate::model::{AnalysisOutput, Diagnostic, DiagnosticSource, PackageId};
use crate::snapshot::PackageSnapshot;

/// What is known about a package before its files are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub id: PackageId,
    pub name: String,
    pub pkg_path: String,
    /// Files in analyzer order.
    pub files: Vec<FileUri>,
    /// Import path → resolved package.
    pub imports: BTreeMap<String, PackageId>,
}

impl PackageMetadata {
    pub fn new(id: PackageId, name: impl Into<String>, pkg_path: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            pkg_path: pkg_path.into(),
            files: Vec::new(),
            imports: BTreeMap::new(),
        }
    }
}

/// Parses and type-checks a package.
///
/// `files` lines up with [`PackageMetadata::files`]; handles whose content is an error are
/// still passed so the analyzer can account for them. `overlays` are all currently open
/// documents, sorted by uri.
pub trait Analyzer: Send + Sync {
    fn analyze(
        &self,
        metadata: &PackageMetadata,
        files: &[Arc<dyn Handle>],
        overlays: &[Arc<OverlayRecord>],
    ) -> AnalysisOutput;
}

#[derive(Debug)]
pub struct Package {
    metadata: PackageMetadata,
    load_diagnostics: Vec<Diagnostic>,
    snapshot: Arc<PackageSnapshot>,
}

impl Package {
    /// Runs `analyzer` over already-read handles.
    pub fn analyze(
        metadata: PackageMetadata,
        files: &[Arc<dyn Handle>],
        overlays: &[Arc<OverlayRecord>],
        analyzer: &dyn Analyzer,
    ) -> Package {
        let load_diagnostics = files
            .iter()
            .filter_map(|handle| {
                let err = handle.content().err()?;
                Some(Diagnostic::error(
                    DiagnosticSource::Load,
                    handle.uri().clone(),
                    err.to_string(),
                ))
            })
            .collect();

        let output = analyzer.analyze(&metadata, files, overlays);
        let snapshot = PackageSnapshot::new(metadata.id.clone(), metadata.files.clone(), output);
        tracing::debug!(
            target = "quarry.index",
            package = %metadata.id,
            files = metadata.files.len(),
            "analyzed package"
        );
        Package {
            metadata,
            load_diagnostics,
            snapshot: Arc::new(snapshot),
        }
    }

    /// Reads the package's files through `store` (overlays first, then disk) and analyzes
    /// them.
    pub async fn load(
        metadata: PackageMetadata,
        store: &OverlayStore,
        cancel: &CancellationToken,
        analyzer: &dyn Analyzer,
    ) -> Result<Package, Cancelled> {
        let mut files = Vec::with_capacity(metadata.files.len());
        for uri in &metadata.files {
            files.push(store.read_file(cancel, uri).await?);
        }

        let mut overlays = store.overlays();
        overlays.sort_by(|a, b| a.uri().cmp(b.uri()));

        Ok(Package::analyze(metadata, &files, &overlays, analyzer))
    }

    pub fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }

    pub fn id(&self) -> &PackageId {
        &self.metadata.id
    }

    /// Files that could not be read.
    pub fn load_diagnostics(&self) -> &[Diagnostic] {
        &self.load_diagnostics
    }

    pub fn snapshot(&self) -> &Arc<PackageSnapshot> {
        &self.snapshot
    }
}
