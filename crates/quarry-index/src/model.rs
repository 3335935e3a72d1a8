use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use quarry_core::{ContentHash, FileUri, Range};
use serde::{Deserialize, Serialize};

/// Stable identifier of a package (usually its import path plus a variant suffix).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(Arc<str>);

impl PackageId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackageId({})", self.0)
    }
}

impl Serialize for PackageId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PackageId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Ok(PackageId::new(id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub uri: FileUri,
    pub range: Range,
}

impl Location {
    pub fn new(uri: FileUri, range: Range) -> Self {
        Self { uri, range }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Func,
    Method { receiver: String },
    Type,
    Var,
    Const,
}

/// A package-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decl {
    pub name: String,
    pub kind: DeclKind,
    pub location: Location,
}

/// A use of an object declared in `package` (an import path, or this package's own path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub package: String,
    pub name: String,
    pub location: Location,
}

/// Syntax-level summary of one file, as produced by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub uri: FileUri,
    pub hash: ContentHash,
    pub package_name: String,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub decls: Vec<Decl>,
    #[serde(default)]
    pub references: Vec<Reference>,
}

impl ParsedFile {
    pub fn new(uri: FileUri, hash: ContentHash, package_name: impl Into<String>) -> Self {
        Self {
            uri,
            hash,
            package_name: package_name.into(),
            imports: Vec::new(),
            decls: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn is_test_file(&self) -> bool {
        self.uri.file_name().ends_with("_test.go")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSource {
    /// The file could not be read.
    Load,
    Parse,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub source: DiagnosticSource,
    pub severity: Severity,
    pub uri: FileUri,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(source: DiagnosticSource, uri: FileUri, message: impl Into<String>) -> Self {
        Self {
            source,
            severity: Severity::Error,
            uri,
            range: None,
            message: message.into(),
        }
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Struct,
    Interface,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    /// Normalized signature text, e.g. `func(p []byte) (int, error)`.
    pub signature: String,
}

impl MethodSig {
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedType {
    pub kind: TypeKind,
    #[serde(default)]
    pub methods: Vec<MethodSig>,
}

impl NamedType {
    pub fn new(kind: TypeKind, methods: impl IntoIterator<Item = MethodSig>) -> Self {
        Self {
            kind,
            methods: methods.into_iter().collect(),
        }
    }
}

/// Named types declared by the package, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTable {
    types: BTreeMap<String, NamedType>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, ty: NamedType) {
        self.types.insert(name.into(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&NamedType> {
        self.types.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NamedType)> {
        self.types.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Types of package-level objects, rendered as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeInfo {
    objects: BTreeMap<String, String>,
}

impl TypeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, object: impl Into<String>, ty: impl Into<String>) {
        self.objects.insert(object.into(), ty.into());
    }

    pub fn type_of(&self, object: &str) -> Option<&str> {
        self.objects.get(object).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Import path → package that path resolved to for this package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportMap {
    resolved: BTreeMap<String, PackageId>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, package: PackageId) {
        self.resolved.insert(path.into(), package);
    }

    pub fn resolve(&self, path: &str) -> Option<&PackageId> {
        self.resolved.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageId)> {
        self.resolved.iter().map(|(path, id)| (path.as_str(), id))
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

impl FromIterator<(String, PackageId)> for ImportMap {
    fn from_iter<I: IntoIterator<Item = (String, PackageId)>>(iter: I) -> Self {
        Self {
            resolved: iter.into_iter().collect(),
        }
    }
}

/// Everything an [`crate::Analyzer`] produces for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOutput {
    pub parsed_files: Vec<ParsedFile>,
    pub diagnostics: Vec<Diagnostic>,
    pub parse_errors: Vec<Diagnostic>,
    pub type_errors: Vec<Diagnostic>,
    pub types: TypeTable,
    pub type_info: TypeInfo,
    pub imports: ImportMap,
}
