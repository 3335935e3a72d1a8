use serde::{Deserialize, Serialize};

/// The kind of source file, as far as the analyzer is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// A `.go` source file.
    Go,
    /// A `go.mod` module file.
    Mod,
    /// A `go.sum` checksum file.
    Sum,
    /// A `go.work` workspace file.
    Work,
    /// A template file (`.tmpl`, `.gotmpl`).
    Tmpl,
    Unknown,
}

impl FileKind {
    /// Classifies a file by its base name.
    pub fn from_file_name(name: &str) -> Self {
        match name {
            "go.mod" => return FileKind::Mod,
            "go.sum" => return FileKind::Sum,
            "go.work" => return FileKind::Work,
            _ => {}
        }

        let Some((_, ext)) = name.rsplit_once('.') else {
            return FileKind::Unknown;
        };
        match ext {
            "go" => FileKind::Go,
            "mod" => FileKind::Mod,
            "sum" => FileKind::Sum,
            "work" => FileKind::Work,
            "tmpl" | "gotmpl" => FileKind::Tmpl,
            _ => FileKind::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Go => "go",
            FileKind::Mod => "mod",
            FileKind::Sum => "sum",
            FileKind::Work => "work",
            FileKind::Tmpl => "tmpl",
            FileKind::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_name_and_extension() {
        assert_eq!(FileKind::from_file_name("a.go"), FileKind::Go);
        assert_eq!(FileKind::from_file_name("a_test.go"), FileKind::Go);
        assert_eq!(FileKind::from_file_name("go.mod"), FileKind::Mod);
        assert_eq!(FileKind::from_file_name("go.sum"), FileKind::Sum);
        assert_eq!(FileKind::from_file_name("go.work"), FileKind::Work);
        assert_eq!(FileKind::from_file_name("page.gotmpl"), FileKind::Tmpl);
        assert_eq!(FileKind::from_file_name("README"), FileKind::Unknown);
        assert_eq!(FileKind::from_file_name("main.rs"), FileKind::Unknown);
    }
}
