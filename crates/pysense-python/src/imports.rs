//! Module import resolution against the project's search directories.
//!
//! Given a dotted module name, walk each path segment against the ordered
//! search directories: `<segment>.py` is a terminal match, `<segment>/` with
//! an `__init__.py` is a directory match. Segments left over when a terminal
//! file is hit are returned as `remaining` — they name a declaration inside
//! that file (`import pkg.mod.Thing` where `pkg/mod.py` defines `Thing`).
//!
//! Resolution failure is a value, never an error.

use crate::scheduler::SearchPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

// ============================================================================
// Resolution
// ============================================================================

/// Outcome of resolving a dotted module name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedImport {
    /// A concrete file, plus any trailing name segments that must be looked
    /// up inside it.
    Found {
        path: PathBuf,
        remaining: Vec<String>,
    },
    /// No search directory contains the module.
    NotFound,
}

impl ResolvedImport {
    pub fn is_found(&self) -> bool {
        matches!(self, ResolvedImport::Found { .. })
    }
}

/// Resolve a dotted module name (`pkg.sub.mod`, or `.sibling` for a
/// current-directory-only import) to a file.
pub fn resolve_module(
    name: &str,
    importing_file: &Path,
    paths: &dyn SearchPaths,
) -> ResolvedImport {
    let mut components: Vec<&str> = name.split('.').filter(|c| !c.is_empty()).collect();
    let current_dir_only = name.starts_with('.');
    if components.is_empty() {
        // `from . import x` — the module is the importing file's directory
        components.push("__init__");
    }

    let search_dirs: Vec<PathBuf> = if current_dir_only {
        importing_file
            .parent()
            .map(|d| vec![d.to_path_buf()])
            .unwrap_or_default()
    } else {
        paths.search_paths(importing_file)
    };
    debug!(module = name, dirs = search_dirs.len(), "resolving import");

    for dir in &search_dirs {
        let mut current = dir.clone();
        let mut remaining: Vec<&str> = components.clone();
        for raw in &components {
            // a star segment means "the package itself"
            let component = if *raw == "*" { "__init__" } else { raw };
            if *raw != "*" {
                remaining.remove(0);
            }
            let source = current.join(format!("{component}.py"));
            let package = current.join(component);
            current = package.clone();
            if !package.is_dir() || remaining.is_empty() {
                if source.is_file() {
                    debug!(path = %source.display(), "import resolved to source file");
                    return ResolvedImport::Found {
                        path: source,
                        remaining: remaining.iter().map(|s| s.to_string()).collect(),
                    };
                }
                if package.is_dir() {
                    let init = package.join("__init__.py");
                    if init.is_file() {
                        debug!(path = %init.display(), "import resolved to package");
                        return ResolvedImport::Found {
                            path: init,
                            remaining: remaining.iter().map(|s| s.to_string()).collect(),
                        };
                    }
                }
                // dead end in this search directory, try the next one
                break;
            }
        }
    }

    debug!(module = name, "import did not resolve");
    ResolvedImport::NotFound
}

// ============================================================================
// Importable Files
// ============================================================================

/// A module or package a completion-item builder could offer for an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCandidate {
    /// The importable name (file stem or directory name).
    pub name: String,
    pub path: PathBuf,
    pub is_package: bool,
}

/// Enumerate the modules importable from the given directories: `*.py` files
/// and subdirectories carrying an `__init__.py`.
pub fn importable_files(dirs: &[PathBuf]) -> Vec<ModuleCandidate> {
    let mut found = Vec::new();
    for dir in dirs {
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if entry.file_type().is_dir() {
                if path.join("__init__.py").is_file() {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        found.push(ModuleCandidate {
                            name: name.to_string(),
                            path: path.to_path_buf(),
                            is_package: true,
                        });
                    }
                }
            } else if path.extension().and_then(|e| e.to_str()) == Some("py") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if stem != "__init__" {
                        found.push(ModuleCandidate {
                            name: stem.to_string(),
                            path: path.to_path_buf(),
                            is_package: false,
                        });
                    }
                }
            }
        }
    }
    found
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::FixedSearchPaths;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    /// pkg/__init__.py, pkg/mod.py, single.py
    fn fixture() -> (tempfile::TempDir, FixedSearchPaths) {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("pkg/__init__.py"));
        touch(&dir.path().join("pkg/mod.py"));
        touch(&dir.path().join("single.py"));
        let paths = FixedSearchPaths(vec![dir.path().to_path_buf()]);
        (dir, paths)
    }

    #[test]
    fn test_resolve_plain_module() {
        let (dir, paths) = fixture();
        let importer = dir.path().join("main.py");
        match resolve_module("single", &importer, &paths) {
            ResolvedImport::Found { path, remaining } => {
                assert_eq!(path, dir.path().join("single.py"));
                assert!(remaining.is_empty());
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_package_and_submodule() {
        let (dir, paths) = fixture();
        let importer = dir.path().join("main.py");
        match resolve_module("pkg", &importer, &paths) {
            ResolvedImport::Found { path, .. } => {
                assert_eq!(path, dir.path().join("pkg/__init__.py"));
            }
            other => panic!("expected Found, got {other:?}"),
        }
        match resolve_module("pkg.mod", &importer, &paths) {
            ResolvedImport::Found { path, remaining } => {
                assert_eq!(path, dir.path().join("pkg/mod.py"));
                assert!(remaining.is_empty());
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_segments_belong_to_the_file() {
        let (dir, paths) = fixture();
        let importer = dir.path().join("main.py");
        // `pkg.mod.Thing` stops at mod.py; `Thing` must be found inside it
        match resolve_module("pkg.mod.Thing", &importer, &paths) {
            ResolvedImport::Found { path, remaining } => {
                assert_eq!(path, dir.path().join("pkg/mod.py"));
                assert_eq!(remaining, vec!["Thing".to_string()]);
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn test_relative_import_searches_current_dir_only() {
        let (dir, _) = fixture();
        // an empty search-path provider: only the leading dot can succeed
        let no_paths = FixedSearchPaths(Vec::new());
        let importer = dir.path().join("main.py");
        assert!(resolve_module(".single", &importer, &no_paths).is_found());
        assert_eq!(
            resolve_module("single", &importer, &no_paths),
            ResolvedImport::NotFound
        );
    }

    #[test]
    fn test_not_found_is_a_value() {
        let (dir, paths) = fixture();
        let importer = dir.path().join("main.py");
        assert_eq!(
            resolve_module("no.such.module", &importer, &paths),
            ResolvedImport::NotFound
        );
    }

    #[test]
    fn test_importable_files_lists_modules_and_packages() {
        let (dir, _) = fixture();
        let found = importable_files(&[dir.path().to_path_buf()]);
        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["pkg", "single"]);
        assert!(found[0].is_package);
        assert!(!found[1].is_package);
    }
}
