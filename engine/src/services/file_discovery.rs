use crate::models::error::XrayError;
use crate::models::file::{FileRecord, ModulePath, ParseStatus};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory names excluded wherever they appear as a path segment.
const DEFAULT_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    ".venv",
    "venv",
    "env",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    ".eggs",
    "build",
    "dist",
    "node_modules",
    "site-packages",
    ".idea",
    ".vscode",
];

/// File globs excluded by default.
const DEFAULT_IGNORED_GLOBS: &[&str] = &["*.pyc", ".*"];

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Additional directory names to exclude.
    pub extra_dirs: Vec<String>,
    /// Additional file globs to exclude.
    pub extra_globs: Vec<String>,
    /// Follow symlinks that resolve inside the target directory.
    pub follow_links: bool,
    /// When true, only files under packages with `__init__.py` get module
    /// paths (namespace packages are still discovered, with a path derived
    /// the same way).
    pub require_init_py: bool,
    /// Safety limit on discovered files.
    pub max_files: Option<usize>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extra_dirs: vec![],
            extra_globs: vec![],
            follow_links: true,
            require_init_py: false,
            max_files: Some(50_000),
        }
    }
}

/// A discovered file: its record plus the source text, read exactly once.
/// `source` is `None` iff the file was unreadable.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub record: FileRecord,
    pub source: Option<String>,
}

/// Walks the target tree in deterministic pre-order and yields Python files
/// that survive the ignore rules.
pub struct FileDiscovery {
    root: PathBuf,
    config: DiscoveryConfig,
}

impl FileDiscovery {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: DiscoveryConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn discover(&self) -> Result<Vec<DiscoveredFile>, XrayError> {
        let root = self
            .root
            .canonicalize()
            .map_err(|_| XrayError::InvalidTarget {
                path: self.root.clone(),
            })?;
        if !root.is_dir() {
            return Err(XrayError::InvalidTarget { path: self.root.clone() });
        }

        let glob_set = self.build_glob_set()?;
        let ignored_dirs: Vec<&str> = DEFAULT_IGNORED_DIRS
            .iter()
            .copied()
            .chain(self.config.extra_dirs.iter().map(String::as_str))
            .collect();

        let max_files = self.config.max_files.unwrap_or(usize::MAX);
        let mut files = Vec::new();

        let walker = WalkDir::new(&root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !(entry.file_type().is_dir() && ignored_dirs.contains(&name.as_ref()))
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("walk error: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().map(|e| e != "py").unwrap_or(true) {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if glob_set.is_match(name.as_ref()) {
                continue;
            }
            if entry.path_is_symlink() && !self.resolves_inside(path, &root) {
                debug!("skipping symlink escaping target: {}", path.display());
                continue;
            }
            if let Some(discovered) = self.read_file(path, &root) {
                files.push(discovered);
                if files.len() >= max_files {
                    warn!("reached maximum file limit: {max_files}");
                    break;
                }
            }
        }

        debug!("discovered {} python files", files.len());
        Ok(files)
    }

    fn build_glob_set(&self) -> Result<GlobSet, XrayError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in DEFAULT_IGNORED_GLOBS
            .iter()
            .copied()
            .chain(self.config.extra_globs.iter().map(String::as_str))
        {
            let glob = Glob::new(pattern).map_err(|e| {
                XrayError::Internal(format!("invalid ignore glob {pattern:?}: {e}"))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| XrayError::Internal(format!("ignore glob set: {e}")))
    }

    fn resolves_inside(&self, path: &Path, root: &Path) -> bool {
        match path.canonicalize() {
            Ok(resolved) => resolved.starts_with(root),
            Err(_) => false,
        }
    }

    fn read_file(&self, path: &Path, root: &Path) -> Option<DiscoveredFile> {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative_path = relative.to_string_lossy().replace('\\', "/");
        let module_path = ModulePath::from_relative(relative)?;

        match std::fs::read_to_string(path) {
            Ok(source) => {
                let bytes = source.len() as u64;
                let record = FileRecord {
                    path: path.to_path_buf(),
                    relative_path,
                    bytes,
                    lines: source.lines().count(),
                    token_estimate: (bytes / 4) as usize,
                    module_path,
                    parse_status: ParseStatus::Parsed,
                };
                Some(DiscoveredFile {
                    record,
                    source: Some(source),
                })
            }
            Err(e) => {
                // Unreadable files are recorded, not silently skipped.
                debug!("unreadable file {}: {e}", path.display());
                let bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                let record = FileRecord {
                    path: path.to_path_buf(),
                    relative_path,
                    bytes,
                    lines: 0,
                    token_estimate: (bytes / 4) as usize,
                    module_path,
                    parse_status: ParseStatus::Unreadable,
                };
                Some(DiscoveredFile {
                    record,
                    source: None,
                })
            }
        }
    }
}
