// src/cli/paths.rs
//
// Path expansion for CLI commands: files, directories and glob patterns to
// C++ sources and headers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::glob;

/// Extensions treated as C++ translation units or headers
pub const SOURCE_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "c", "cc", "cpp", "cxx"];

/// Errors that can occur during path expansion
#[derive(Debug)]
pub enum PathError {
    /// Glob pattern syntax error
    InvalidPattern { pattern: String, message: String },
    /// IO error (permissions, etc.)
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::InvalidPattern { pattern, message } => {
                write!(f, "invalid glob pattern '{}': {}", pattern, message)
            }
            PathError::IoError { path, source } => {
                write!(f, "error reading '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Expand a list of path patterns into concrete source file paths.
///
/// Each pattern can be:
/// - A direct file path (e.g., "list.hpp")
/// - A directory (expands to every C++ source below it)
/// - A glob pattern (e.g., "src/**/*.cpp")
///
/// Explicit files keep their input order; directory and glob matches are
/// sorted and appended after them. Duplicates are removed.
pub fn expand_paths(patterns: &[String]) -> Result<Vec<PathBuf>, PathError> {
    let mut explicit_files = Vec::new();
    let mut glob_files = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for pattern in patterns {
        expand_pattern(pattern, &mut explicit_files, &mut glob_files, &mut seen)?;
    }

    glob_files.sort();
    explicit_files.extend(glob_files);
    Ok(explicit_files)
}

fn expand_pattern(
    pattern: &str,
    explicit_files: &mut Vec<PathBuf>,
    glob_files: &mut Vec<PathBuf>,
    seen: &mut HashSet<PathBuf>,
) -> Result<(), PathError> {
    let path = PathBuf::from(pattern);

    if path.is_file() {
        if has_source_extension(&path) {
            add_unique(path, explicit_files, seen);
        } else {
            tracing::debug!(path = %path.display(), "skipping file without a C++ extension");
        }
    } else if path.is_dir() {
        let glob_pattern = format!("{}/**/*", pattern.trim_end_matches('/'));
        expand_glob(&glob_pattern, glob_files, seen)?;
    } else {
        expand_glob(pattern, glob_files, seen)?;
    }

    Ok(())
}

fn expand_glob(
    pattern: &str,
    files: &mut Vec<PathBuf>,
    seen: &mut HashSet<PathBuf>,
) -> Result<(), PathError> {
    let entries = glob(pattern).map_err(|e| PathError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })?;

    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_file() && has_source_extension(&path) {
                    add_unique(path, files, seen);
                }
            }
            Err(e) => {
                return Err(PathError::IoError {
                    path: e.path().to_path_buf(),
                    source: e.into_error(),
                });
            }
        }
    }

    Ok(())
}

/// Add a path if not already seen (uses canonical path for deduplication)
fn add_unique(path: PathBuf, files: &mut Vec<PathBuf>, seen: &mut HashSet<PathBuf>) {
    let key = path.canonicalize().unwrap_or_else(|_| path.clone());
    if seen.insert(key) {
        files.push(path);
    }
}

pub fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// The deepest directory containing every file; outputs keep their path
/// relative to it.
pub fn common_root(files: &[PathBuf]) -> PathBuf {
    let mut parents = files
        .iter()
        .map(|f| f.parent().map(Path::to_path_buf).unwrap_or_default());
    let Some(first) = parents.next() else {
        return PathBuf::new();
    };
    parents.fold(first, |root, dir| {
        root.components()
            .zip(dir.components())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(&path).unwrap();
        file.write_all(b"// test").unwrap();
        path
    }

    #[test]
    fn test_expand_single_file() {
        let dir = TempDir::new().unwrap();
        let file = create_file(dir.path(), "list.hpp");

        let files = expand_paths(&[file.to_string_lossy().to_string()]).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_expand_directory_filters_extensions() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "a.cpp");
        create_file(dir.path(), "b.h");
        create_file(dir.path(), "sub/c.cxx");
        create_file(dir.path(), "notes.txt");
        create_file(dir.path(), "Makefile");

        let files = expand_paths(&[dir.path().to_string_lossy().to_string()]).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_expand_glob_pattern() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "stack.cpp");
        create_file(dir.path(), "queue.cpp");
        create_file(dir.path(), "queue.hpp");

        let pattern = format!("{}/*.cpp", dir.path().display());
        let files = expand_paths(&[pattern]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_explicit_files_keep_order_and_deduplicate() {
        let dir = TempDir::new().unwrap();
        let z = create_file(dir.path(), "z.cpp");
        let a = create_file(dir.path(), "a.cpp");
        let z_str = z.to_string_lossy().to_string();

        let files = expand_paths(&[
            z_str.clone(),
            a.to_string_lossy().to_string(),
            z_str,
            dir.path().to_string_lossy().to_string(),
        ])
        .unwrap();
        assert_eq!(files, vec![z, a]);
    }

    #[test]
    fn test_invalid_glob_pattern() {
        let result = expand_paths(&["[invalid".to_string()]);
        assert!(matches!(result, Err(PathError::InvalidPattern { .. })));
    }

    #[test]
    fn test_common_root() {
        let files = vec![
            PathBuf::from("proj/src/list.cpp"),
            PathBuf::from("proj/include/list.hpp"),
        ];
        assert_eq!(common_root(&files), PathBuf::from("proj"));
        assert_eq!(
            common_root(&[PathBuf::from("proj/src/a.cpp")]),
            PathBuf::from("proj/src")
        );
        assert_eq!(common_root(&[]), PathBuf::new());
    }
}
