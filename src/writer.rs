//! Filesystem mutations: atomic writes, removals and empty-directory pruning.
//!
//! Every write lands in a temp file next to its target and is renamed into
//! place, so a crash never leaves a half-written artifact or manifest.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{ScaffoldError, ScaffoldResult};
use crate::naming::ensure_relative_path;

/// Joins a project-relative artifact path onto `root` after checking it
/// cannot escape.
pub fn resolve(root: &Path, relative: &str) -> ScaffoldResult<PathBuf> {
    let relative = ensure_relative_path(relative)?;
    Ok(root.join(relative))
}

pub fn write_atomic(path: &Path, content: &[u8]) -> ScaffoldResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| ScaffoldError::io(parent, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| ScaffoldError::io(parent, e))?;
    temp.write_all(content)
        .and_then(|_| temp.flush())
        .map_err(|e| ScaffoldError::io(path, e))?;
    temp.persist(path)
        .map_err(|e| ScaffoldError::io(path, e.error))?;
    Ok(())
}

/// Removes a file. Returns `false` when it was already gone.
pub fn remove_file(path: &Path) -> ScaffoldResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ScaffoldError::io(path, e)),
    }
}

/// Removes empty directories from `start` upward, stopping at `root`
/// (never removed) or the first non-empty directory.
pub fn prune_empty_dirs(root: &Path, start: &Path) -> ScaffoldResult<Vec<PathBuf>> {
    let mut pruned = Vec::new();
    let mut current = start.to_path_buf();
    while current != root && current.starts_with(root) {
        let mut entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if !current.pop() {
                    break;
                }
                continue;
            }
            Err(e) => return Err(ScaffoldError::io(&current, e)),
        };
        if entries.next().is_some() {
            break;
        }
        fs::remove_dir(&current).map_err(|e| ScaffoldError::io(&current, e))?;
        tracing::debug!(dir = %current.display(), "pruned empty directory");
        pruned.push(current.clone());
        if !current.pop() {
            break;
        }
    }
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn atomic_write_creates_parents_and_replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layers/shop/types/products.ts");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn removing_a_missing_file_is_not_an_error() {
        let dir = tempdir().unwrap();
        assert!(!remove_file(&dir.path().join("gone.ts")).unwrap());
    }

    #[test]
    fn pruning_stops_at_first_non_empty_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("layers/shop/components/products")).unwrap();
        fs::write(root.join("layers/shop/nuxt.config.ts"), "").unwrap();

        let pruned = prune_empty_dirs(root, &root.join("layers/shop/components/products")).unwrap();
        assert_eq!(pruned.len(), 2);
        assert!(!root.join("layers/shop/components").exists());
        assert!(root.join("layers/shop").exists());
    }

    #[test]
    fn pruning_never_removes_the_root() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("layers")).unwrap();
        prune_empty_dirs(root, &root.join("layers")).unwrap();
        assert!(root.exists());
        assert!(!root.join("layers").exists());
    }

    #[test]
    fn resolve_rejects_escaping_paths() {
        let dir = tempdir().unwrap();
        assert_matches!(
            resolve(dir.path(), "../outside.ts"),
            Err(ScaffoldError::UnsafePath { .. })
        );
        assert_eq!(
            resolve(dir.path(), "layers/a.ts").unwrap(),
            dir.path().join("layers/a.ts")
        );
    }
}
