use std::collections::HashMap;
use std::sync::Arc;

use quarry_core::FileUri;

use crate::error::LookupError;
use crate::indexes::{MethodSetIndex, TestIndex, XrefIndex};
use crate::lazy::LazyIndex;
use crate::model::{
    AnalysisOutput, Diagnostic, ImportMap, PackageId, ParsedFile, TypeInfo, TypeTable,
};

/// Which derived indices of a snapshot have been built so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexesBuilt {
    pub xrefs: bool,
    pub method_sets: bool,
    pub tests: bool,
}

/// Lazily built derived indices of one [`PackageSnapshot`]. Each index has its own gate, so
/// building one never waits on another.
#[derive(Debug)]
pub struct PackageIndexCache {
    xrefs: LazyIndex<XrefIndex>,
    method_sets: LazyIndex<MethodSetIndex>,
    tests: LazyIndex<TestIndex>,
}

impl PackageIndexCache {
    pub fn new() -> Self {
        Self {
            xrefs: LazyIndex::new("xrefs"),
            method_sets: LazyIndex::new("method_sets"),
            tests: LazyIndex::new("tests"),
        }
    }

    pub fn built(&self) -> IndexesBuilt {
        IndexesBuilt {
            xrefs: self.xrefs.is_built(),
            method_sets: self.method_sets.is_built(),
            tests: self.tests.is_built(),
        }
    }
}

impl Default for PackageIndexCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable result of analyzing one package at one point in time.
///
/// A new analysis pass produces a new snapshot; derived indices never carry over.
#[derive(Debug)]
pub struct PackageSnapshot {
    id: PackageId,
    files: Vec<FileUri>,
    parsed_files: Vec<ParsedFile>,
    by_uri: HashMap<FileUri, usize>,
    diagnostics: Vec<Diagnostic>,
    parse_errors: Vec<Diagnostic>,
    type_errors: Vec<Diagnostic>,
    types: TypeTable,
    type_info: TypeInfo,
    imports: ImportMap,
    indexes: PackageIndexCache,
}

impl PackageSnapshot {
    pub fn new(id: PackageId, files: Vec<FileUri>, output: AnalysisOutput) -> Self {
        let by_uri = output
            .parsed_files
            .iter()
            .enumerate()
            .map(|(idx, file)| (file.uri.clone(), idx))
            .collect();
        Self {
            id,
            files,
            parsed_files: output.parsed_files,
            by_uri,
            diagnostics: output.diagnostics,
            parse_errors: output.parse_errors,
            type_errors: output.type_errors,
            types: output.types,
            type_info: output.type_info,
            imports: output.imports,
            indexes: PackageIndexCache::new(),
        }
    }

    pub fn id(&self) -> &PackageId {
        &self.id
    }

    /// The package's files, in the order they were handed to the analyzer.
    pub fn files(&self) -> &[FileUri] {
        &self.files
    }

    pub fn parsed_files(&self) -> &[ParsedFile] {
        &self.parsed_files
    }

    pub fn file(&self, uri: &FileUri) -> Result<&ParsedFile, LookupError> {
        self.by_uri
            .get(uri)
            .map(|&idx| &self.parsed_files[idx])
            .ok_or_else(|| LookupError::FileNotInPackage {
                package: self.id.clone(),
                uri: uri.clone(),
            })
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn parse_errors(&self) -> &[Diagnostic] {
        &self.parse_errors
    }

    pub fn type_errors(&self) -> &[Diagnostic] {
        &self.type_errors
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub fn imports(&self) -> &ImportMap {
        &self.imports
    }

    pub fn xrefs(&self) -> Arc<XrefIndex> {
        self.indexes
            .xrefs
            .get_or_build(|| XrefIndex::build(&self.parsed_files))
    }

    pub fn method_sets(&self) -> Arc<MethodSetIndex> {
        self.indexes
            .method_sets
            .get_or_build(|| MethodSetIndex::build(&self.types))
    }

    pub fn tests(&self) -> Arc<TestIndex> {
        self.indexes
            .tests
            .get_or_build(|| TestIndex::build(&self.parsed_files))
    }

    pub fn indexes_built(&self) -> IndexesBuilt {
        self.indexes.built()
    }
}
