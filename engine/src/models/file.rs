use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Canonical dotted identifier for a source file within the target tree.
///
/// Derived from the relative path: separators become dots, the `.py` suffix is
/// stripped, and a trailing `__init__` segment is stripped so packages resolve
/// to their directory name. Unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModulePath(String);

impl ModulePath {
    pub fn new(dotted: impl Into<String>) -> Self {
        Self(dotted.into())
    }

    /// Derive the module path from a path relative to the target root.
    ///
    /// Returns `None` for paths that cannot name a module (empty, non-UTF-8).
    pub fn from_relative(rel: &Path) -> Option<Self> {
        let mut segments: Vec<&str> = Vec::new();
        for component in rel.components() {
            segments.push(component.as_os_str().to_str()?);
        }
        let last = segments.pop()?;
        let stem = last.strip_suffix(".py").unwrap_or(last);
        if stem != "__init__" {
            segments.push(stem);
        }
        if segments.is_empty() {
            // `__init__.py` at the target root: the package has no name.
            return Some(Self(String::new()));
        }
        Some(Self(segments.join(".")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First dotted segment, e.g. `pkg` for `pkg.sub.mod`.
    pub fn top_segment(&self) -> &str {
        self.0.split('.').next().unwrap_or("")
    }

    /// True when `self` is `prefix` or lies under it in the dotted hierarchy.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0 == prefix || self.0.starts_with(&format!("{prefix}."))
    }
}

impl std::fmt::Display for ModulePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of reading and parsing a single source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Parsed,
    SyntaxError,
    Unreadable,
}

/// One record per discovered source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub relative_path: String,
    pub bytes: u64,
    pub lines: usize,
    /// Rough context-window cost: bytes / 4.
    pub token_estimate: usize,
    pub module_path: ModulePath,
    pub parse_status: ParseStatus,
}

impl FileRecord {
    pub fn is_parsed(&self) -> bool {
        self.parse_status == ParseStatus::Parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_path_from_nested_file() {
        let m = ModulePath::from_relative(Path::new("pkg/sub/mod.py")).unwrap();
        assert_eq!(m.as_str(), "pkg.sub.mod");
        assert_eq!(m.top_segment(), "pkg");
    }

    #[test]
    fn init_segment_is_stripped() {
        let m = ModulePath::from_relative(Path::new("pkg/sub/__init__.py")).unwrap();
        assert_eq!(m.as_str(), "pkg.sub");
    }

    #[test]
    fn top_level_file() {
        let m = ModulePath::from_relative(Path::new("main.py")).unwrap();
        assert_eq!(m.as_str(), "main");
    }

    #[test]
    fn prefix_matching_respects_dot_boundaries() {
        let m = ModulePath::new("pkg.submodule");
        assert!(m.starts_with("pkg"));
        assert!(m.starts_with("pkg.submodule"));
        assert!(!m.starts_with("pkg.sub"));
    }
}
