//! JWalk-based traversal feeding the worker pool.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use rescan_core::EntryKind;

use crate::filter::Filter;

/// A traversal result in flight between the walk and one worker.
#[derive(Debug)]
pub struct RawEntry {
    /// Absolute path.
    pub path: PathBuf,
    /// Type reported by the walk; `Unsupported` when the walk failed.
    pub kind: EntryKind,
    /// Walk failure for this path.
    pub error: Option<std::io::Error>,
}

impl RawEntry {
    /// Create an entry for a successfully walked path.
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
            error: None,
        }
    }

    /// Create an entry for a path the walk could not read.
    pub fn failed(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Unsupported,
            error: Some(error),
        }
    }
}

/// Walk the filter's root depth-first and hand every accepted entry,
/// and every walk failure, to `visit`.
///
/// Directories the filter prunes are yielded (when reported) but never
/// descended into. Symlinks are not followed. Failures are passed through
/// unfiltered; the caller decides which rules still apply to them.
pub fn walk(filter: &Filter, mut visit: impl FnMut(RawEntry) -> ControlFlow<()>) {
    let pruner = filter.clone();
    let walker = WalkDir::new(filter.root())
        .parallelism(Parallelism::Serial)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .process_read_dir(move |_depth, _dir, _state, children| {
            for child in children.iter_mut().flatten() {
                if child.file_type.is_dir()
                    && pruner.decide(&child.path(), EntryKind::Directory).prunes()
                {
                    child.read_children_path = None;
                }
            }
        });

    for item in walker {
        let raw = match item {
            Ok(entry) => {
                let path = entry.path();
                let kind = EntryKind::from(entry.file_type());
                if !filter.decide(&path, kind).accepts() {
                    continue;
                }
                RawEntry::new(path, kind)
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| filter.root().to_path_buf());
                RawEntry::failed(path, std::io::Error::other(err.to_string()))
            }
        };

        if visit(raw).is_break() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescan_core::Options;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();
        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();

        temp
    }

    fn collect(filter: &Filter) -> Vec<RawEntry> {
        let mut entries = Vec::new();
        walk(filter, |raw| {
            entries.push(raw);
            ControlFlow::Continue(())
        });
        entries
    }

    #[test]
    fn test_walk_skips_root() {
        let temp = create_test_tree();
        let root = temp.path().canonicalize().unwrap();
        let filter = Filter::new(&root, Options::shared());

        let entries = collect(&filter);
        assert_eq!(entries.len(), 5);
        assert!(entries.iter().all(|e| e.path != root && e.error.is_none()));
        assert!(
            entries
                .iter()
                .any(|e| e.path == root.join("dir1/subdir") && e.kind == EntryKind::Directory)
        );
    }

    #[test]
    fn test_walk_prunes_folder_content() {
        let temp = create_test_tree();
        let root = temp.path().canonicalize().unwrap();
        let options = Options::shared();
        options.set_ignore_folder_content(true);
        let filter = Filter::new(&root, Arc::clone(&options));

        let mut paths: Vec<PathBuf> = collect(&filter).into_iter().map(|e| e.path).collect();
        paths.sort();
        assert_eq!(paths, vec![root.join("dir1"), root.join("file1.txt")]);
    }

    #[test]
    fn test_walk_stops_on_break() {
        let temp = create_test_tree();
        let filter = Filter::new(temp.path().canonicalize().unwrap(), Options::shared());

        let mut seen = 0;
        walk(&filter, |_| {
            seen += 1;
            ControlFlow::Break(())
        });
        assert_eq!(seen, 1);
    }
}
