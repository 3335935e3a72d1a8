use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{DeclKind, Location, MethodSig, ParsedFile, TypeKind, TypeTable};

/// Cross-reference index: every use of an object, grouped by the object it refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XrefIndex {
    references: BTreeMap<(String, String), Vec<Location>>,
    imported_packages: BTreeSet<String>,
}

impl XrefIndex {
    pub fn build(files: &[ParsedFile]) -> Self {
        let mut index = Self::default();
        for file in files {
            index
                .imported_packages
                .extend(file.imports.iter().cloned());
            for reference in &file.references {
                index
                    .references
                    .entry((reference.package.clone(), reference.name.clone()))
                    .or_default()
                    .push(reference.location.clone());
            }
        }
        for locations in index.references.values_mut() {
            locations.sort();
            locations.dedup();
        }
        index
    }

    /// Sorted locations in this package that refer to `package.name`.
    pub fn references(&self, package: &str, name: &str) -> &[Location] {
        self.references
            .get(&(package.to_owned(), name.to_owned()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every `(package, name)` referenced from this package.
    pub fn referenced_objects(&self) -> impl Iterator<Item = (&str, &str)> {
        self.references
            .keys()
            .map(|(package, name)| (package.as_str(), name.as_str()))
    }

    pub fn imported_packages(&self) -> impl Iterator<Item = &str> {
        self.imported_packages.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// The sorted, de-duplicated method set of a named type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodSetKey(Vec<MethodSig>);

impl MethodSetKey {
    pub fn new(methods: impl IntoIterator<Item = MethodSig>) -> Self {
        let mut methods: Vec<_> = methods.into_iter().collect();
        methods.sort();
        methods.dedup();
        Self(methods)
    }

    pub fn methods(&self) -> &[MethodSig] {
        &self.0
    }

    /// Whether every method of `other` (name and signature) is also in `self`.
    pub fn is_superset_of(&self, other: &MethodSetKey) -> bool {
        other.0.iter().all(|sig| self.0.binary_search(sig).is_ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSetIndex {
    sets: BTreeMap<String, (TypeKind, MethodSetKey)>,
}

impl MethodSetIndex {
    pub fn build(types: &TypeTable) -> Self {
        let sets = types
            .iter()
            .map(|(name, ty)| {
                (
                    name.to_owned(),
                    (ty.kind, MethodSetKey::new(ty.methods.iter().cloned())),
                )
            })
            .collect();
        Self { sets }
    }

    pub fn method_set(&self, type_name: &str) -> Option<&MethodSetKey> {
        self.sets.get(type_name).map(|(_, key)| key)
    }

    /// Concrete (non-interface) types whose method set covers the interface's, sorted by
    /// name. Empty if `interface` is unknown or not an interface.
    pub fn implementers(&self, interface: &str) -> Vec<&str> {
        let Some((TypeKind::Interface, wanted)) = self.sets.get(interface) else {
            return Vec::new();
        };
        self.sets
            .iter()
            .filter(|(_, (kind, key))| *kind != TypeKind::Interface && key.is_superset_of(wanted))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Test,
    Benchmark,
    Fuzz,
    Example,
}

impl TestKind {
    const ALL: [TestKind; 4] = [
        TestKind::Test,
        TestKind::Benchmark,
        TestKind::Fuzz,
        TestKind::Example,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            TestKind::Test => "Test",
            TestKind::Benchmark => "Benchmark",
            TestKind::Fuzz => "Fuzz",
            TestKind::Example => "Example",
        }
    }

    /// Classifies a function name the way `go test` does: the prefix must be followed by
    /// nothing or by a character that is not a lowercase letter (`TestFoo`, `Test_foo` and
    /// `Test` qualify, `Testify` does not).
    pub fn classify(name: &str) -> Option<TestKind> {
        Self::ALL.into_iter().find(|kind| {
            name.strip_prefix(kind.prefix())
                .is_some_and(|rest| !rest.chars().next().is_some_and(char::is_lowercase))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFunction {
    pub name: String,
    pub kind: TestKind,
    pub location: Location,
}

/// Test-like functions declared in the package's `_test.go` files, in file then
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestIndex {
    tests: Vec<TestFunction>,
}

impl TestIndex {
    pub fn build(files: &[ParsedFile]) -> Self {
        let tests = files
            .iter()
            .filter(|file| file.is_test_file())
            .flat_map(|file| &file.decls)
            .filter(|decl| decl.kind == DeclKind::Func)
            .filter_map(|decl| {
                Some(TestFunction {
                    name: decl.name.clone(),
                    kind: TestKind::classify(&decl.name)?,
                    location: decl.location.clone(),
                })
            })
            .collect();
        Self { tests }
    }

    pub fn tests(&self) -> &[TestFunction] {
        &self.tests
    }

    pub fn by_kind(&self, kind: TestKind) -> impl Iterator<Item = &TestFunction> {
        self.tests.iter().filter(move |test| test.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quarry_core::{ContentHash, FileUri, Position, Range};

    use crate::model::{Decl, NamedType, Reference};

    fn loc(path: &str, line: u32) -> Location {
        Location::new(
            FileUri::from_path(path).unwrap(),
            Range::point(Position::new(line, 0)),
        )
    }

    fn file(path: &str) -> ParsedFile {
        ParsedFile::new(FileUri::from_path(path).unwrap(), ContentHash::empty(), "p")
    }

    fn func(name: &str, path: &str, line: u32) -> Decl {
        Decl {
            name: name.to_owned(),
            kind: DeclKind::Func,
            location: loc(path, line),
        }
    }

    #[test]
    fn test_kind_follows_go_naming_rule() {
        assert_eq!(TestKind::classify("TestParse"), Some(TestKind::Test));
        assert_eq!(TestKind::classify("Test"), Some(TestKind::Test));
        assert_eq!(TestKind::classify("Test_parse"), Some(TestKind::Test));
        assert_eq!(TestKind::classify("Testify"), None);
        assert_eq!(TestKind::classify("BenchmarkRead"), Some(TestKind::Benchmark));
        assert_eq!(TestKind::classify("FuzzDecode"), Some(TestKind::Fuzz));
        assert_eq!(TestKind::classify("Example"), Some(TestKind::Example));
        assert_eq!(TestKind::classify("ExampleReader_Read"), Some(TestKind::Example));
        assert_eq!(TestKind::classify("helper"), None);
    }

    #[test]
    fn test_index_only_scans_test_files_and_plain_functions() {
        let mut lib = file("/p/lib.go");
        lib.decls.push(func("TestNotReally", "/p/lib.go", 3));

        let mut tests = file("/p/lib_test.go");
        tests.decls.push(func("TestA", "/p/lib_test.go", 5));
        tests.decls.push(func("helper", "/p/lib_test.go", 9));
        tests.decls.push(func("BenchmarkA", "/p/lib_test.go", 12));
        tests.decls.push(Decl {
            name: "TestMethod".to_owned(),
            kind: DeclKind::Method {
                receiver: "*suite".to_owned(),
            },
            location: loc("/p/lib_test.go", 20),
        });

        let index = TestIndex::build(&[lib, tests]);
        let names: Vec<_> = index.tests().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["TestA", "BenchmarkA"]);
        assert_eq!(index.by_kind(TestKind::Benchmark).count(), 1);
        assert_eq!(index.by_kind(TestKind::Fuzz).count(), 0);
    }

    #[test]
    fn xrefs_are_grouped_and_sorted() {
        let mut a = file("/p/a.go");
        a.imports.push("fmt".to_owned());
        let mut b = file("/p/b.go");
        b.imports.push("fmt".to_owned());
        b.imports.push("io".to_owned());
        let println_at = |path: &str, line: u32| Reference {
            package: "fmt".to_owned(),
            name: "Println".to_owned(),
            location: loc(path, line),
        };
        b.references.push(println_at("/p/b.go", 7));
        a.references.push(println_at("/p/a.go", 4));
        b.references.push(println_at("/p/b.go", 2));

        let index = XrefIndex::build(&[a, b]);
        assert_eq!(
            index.references("fmt", "Println"),
            [loc("/p/a.go", 4), loc("/p/b.go", 2), loc("/p/b.go", 7)]
        );
        assert!(index.references("fmt", "Printf").is_empty());
        assert_eq!(index.imported_packages().collect::<Vec<_>>(), ["fmt", "io"]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn implementers_need_matching_signatures() {
        let read = MethodSig::new("Read", "func(p []byte) (int, error)");
        let close = MethodSig::new("Close", "func() error");

        let mut types = TypeTable::new();
        types.insert("Reader", NamedType::new(TypeKind::Interface, [read.clone()]));
        types.insert(
            "ReadCloser",
            NamedType::new(TypeKind::Interface, [read.clone(), close.clone()]),
        );
        types.insert("file", NamedType::new(TypeKind::Struct, [close, read]));
        types.insert(
            "fake",
            NamedType::new(TypeKind::Struct, [MethodSig::new("Read", "func() int")]),
        );
        types.insert("count", NamedType::new(TypeKind::Other, Vec::new()));

        let index = MethodSetIndex::build(&types);
        assert_eq!(index.implementers("Reader"), ["file"]);
        assert_eq!(index.implementers("ReadCloser"), ["file"]);
        assert!(index.implementers("file").is_empty());
        assert!(index.implementers("missing").is_empty());

        let names: Vec<_> = index
            .method_set("file")
            .unwrap()
            .methods()
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, ["Close", "Read"]);
    }
}
