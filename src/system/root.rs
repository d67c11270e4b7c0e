//! Project root discovery
//!
//! Walks lexically upward from a start directory looking for a marker entry.

use crate::error::{ClusterError, IoResultExt, Result};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Marker directory that identifies the project root
pub const DEFAULT_ROOT_MARKER: &str = "local_software";

/// Number of directories examined: the start directory plus four ancestors
pub const DEFAULT_SEARCH_LEVELS: usize = 5;

/// Find the closest directory at or above `start` that contains `marker`.
///
/// At most `max_levels` directories are examined. A relative `start` is
/// anchored at the current directory. Parents are taken lexically, so
/// symlinked components are not resolved.
pub fn find_project_root(start: &Path, marker: &str, max_levels: usize) -> Result<PathBuf> {
    let cwd = if start.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir().with_path(start)?
    };
    search_upward(&anchor(&cwd, start), start, marker, max_levels)
}

/// Join `start` onto `cwd` and fold `.` and `..` components
fn anchor(cwd: &Path, start: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in cwd.join(start).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved
}

fn search_upward(from: &Path, start: &Path, marker: &str, max_levels: usize) -> Result<PathBuf> {
    let mut candidate = Some(from);

    for level in 0..max_levels {
        let Some(dir) = candidate else { break };

        if dir.join(marker).exists() {
            debug!(root = %dir.display(), level, "found project root");
            return Ok(dir.to_path_buf());
        }

        candidate = dir.parent();
    }

    Err(ClusterError::RootNotFound {
        start: start.to_path_buf(),
        marker: marker.to_string(),
        levels: max_levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_marker_in_start_dir() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(DEFAULT_ROOT_MARKER)).unwrap();

        let root =
            find_project_root(tmp.path(), DEFAULT_ROOT_MARKER, DEFAULT_SEARCH_LEVELS).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn test_marker_three_levels_up() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(DEFAULT_ROOT_MARKER)).unwrap();
        let start = tmp.path().join("a").join("b").join("c");
        fs::create_dir_all(&start).unwrap();

        let root = find_project_root(&start, DEFAULT_ROOT_MARKER, DEFAULT_SEARCH_LEVELS).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn test_marker_at_last_level() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(DEFAULT_ROOT_MARKER)).unwrap();
        let start = tmp.path().join("a").join("b").join("c").join("d");
        fs::create_dir_all(&start).unwrap();

        assert!(find_project_root(&start, DEFAULT_ROOT_MARKER, DEFAULT_SEARCH_LEVELS).is_ok());
    }

    #[test]
    fn test_marker_beyond_bound() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(DEFAULT_ROOT_MARKER)).unwrap();
        let start = tmp.path().join("a").join("b").join("c").join("d").join("e");
        fs::create_dir_all(&start).unwrap();

        let err =
            find_project_root(&start, DEFAULT_ROOT_MARKER, DEFAULT_SEARCH_LEVELS).unwrap_err();
        match err {
            ClusterError::RootNotFound { start: s, levels, .. } => {
                assert_eq!(s, start);
                assert_eq!(levels, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_marker() {
        let tmp = TempDir::new().unwrap();
        let start = tmp.path().join("x");
        fs::create_dir_all(&start).unwrap();

        let result = find_project_root(&start, "no_such_marker_dir_here", DEFAULT_SEARCH_LEVELS);
        assert!(matches!(result, Err(ClusterError::RootNotFound { .. })));
    }

    #[test]
    fn test_zero_levels_never_matches() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(DEFAULT_ROOT_MARKER)).unwrap();

        assert!(find_project_root(tmp.path(), DEFAULT_ROOT_MARKER, 0).is_err());
    }

    #[test]
    fn test_anchor_folds_relative_components() {
        let cwd = Path::new("/work/proj/a/b/c");
        assert_eq!(anchor(cwd, Path::new(".")), PathBuf::from("/work/proj/a/b/c"));
        assert_eq!(anchor(cwd, Path::new("..")), PathBuf::from("/work/proj/a/b"));
        assert_eq!(anchor(cwd, Path::new("../../x/.")), PathBuf::from("/work/proj/a/x"));
        assert_eq!(anchor(cwd, Path::new("/abs/./y/..")), PathBuf::from("/abs"));
    }

    #[test]
    fn test_relative_dot_start_climbs() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(DEFAULT_ROOT_MARKER)).unwrap();
        let cwd = tmp.path().join("a").join("b").join("c");
        fs::create_dir_all(&cwd).unwrap();

        let from = anchor(&cwd, Path::new("."));
        let root = search_upward(
            &from,
            Path::new("."),
            DEFAULT_ROOT_MARKER,
            DEFAULT_SEARCH_LEVELS,
        )
        .unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn test_relative_parent_start_never_descends() {
        let tmp = TempDir::new().unwrap();
        let cwd = tmp.path().join("a");
        fs::create_dir_all(cwd.join(DEFAULT_ROOT_MARKER)).unwrap();

        // Marker lives only in the current directory, below the start
        let from = anchor(&cwd, Path::new(".."));
        assert_eq!(from, tmp.path());
        let result = search_upward(&from, Path::new(".."), DEFAULT_ROOT_MARKER, 2);
        assert!(matches!(result, Err(ClusterError::RootNotFound { .. })));
    }

    #[test]
    fn test_relative_start_resolves_to_absolute() {
        // cargo runs unit tests from the package directory
        let cwd = std::env::current_dir().unwrap();
        let root = find_project_root(Path::new("."), "Cargo.toml", 1).unwrap();
        assert!(root.is_absolute());
        assert_eq!(root, cwd);
    }
}
