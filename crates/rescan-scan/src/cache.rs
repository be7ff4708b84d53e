//! Concurrent per-path snapshot cache.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rescan_core::PathSnapshot;

/// Outcome of visiting one cached entry during [`PathCache::for_each`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Leave the entry as it is.
    Keep,
    /// Replace the entry.
    Update(PathSnapshot),
    /// Evict the entry.
    Remove,
    /// Stop iterating.
    Stop,
}

/// Last observed state of every tracked path.
///
/// Per-path operations are atomic. Workers of one pass touch disjoint
/// paths concurrently; [`PathCache::for_each`] is only run once they have
/// all retired.
#[derive(Debug, Default)]
pub struct PathCache {
    entries: DashMap<PathBuf, PathSnapshot>,
}

impl PathCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Get a copy of the snapshot for `path`.
    pub fn lookup(&self, path: &Path) -> Option<PathSnapshot> {
        self.entries.get(path).map(|entry| *entry)
    }

    /// Insert or replace the snapshot for `path`.
    pub fn store(&self, path: impl Into<PathBuf>, snapshot: PathSnapshot) {
        self.entries.insert(path.into(), snapshot);
    }

    /// Remove `path`, returning its last snapshot.
    pub fn delete(&self, path: &Path) -> Option<PathSnapshot> {
        self.entries.remove(path).map(|(_, snapshot)| snapshot)
    }

    /// Atomically inspect and update the entry for `path`.
    ///
    /// `f` receives the current snapshot (if any) and returns the snapshot
    /// to keep together with a value handed back to the caller. The shard
    /// holding `path` stays locked while `f` runs.
    pub fn update<T>(
        &self,
        path: &Path,
        f: impl FnOnce(Option<&PathSnapshot>) -> (PathSnapshot, T),
    ) -> T {
        match self.entries.entry(path.to_path_buf()) {
            Entry::Occupied(mut occupied) => {
                let (snapshot, out) = f(Some(occupied.get()));
                occupied.insert(snapshot);
                out
            }
            Entry::Vacant(vacant) => {
                let (snapshot, out) = f(None);
                vacant.insert(snapshot);
                out
            }
        }
    }

    /// Visit every entry.
    ///
    /// The visitor runs without holding any map lock, so it may block
    /// (e.g. on a full event queue). Entries removed concurrently are
    /// skipped.
    pub fn for_each(&self, mut visit: impl FnMut(&Path, &PathSnapshot) -> Visit) {
        let paths: Vec<PathBuf> = self.entries.iter().map(|entry| entry.key().clone()).collect();

        for path in paths {
            let Some(snapshot) = self.lookup(&path) else {
                continue;
            };
            match visit(&path, &snapshot) {
                Visit::Keep => {}
                Visit::Update(updated) => {
                    if let Some(mut entry) = self.entries.get_mut(&path) {
                        *entry = updated;
                    }
                }
                Visit::Remove => {
                    self.entries.remove(&path);
                }
                Visit::Stop => break,
            }
        }
    }

    /// Drop every snapshot.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no path is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescan_core::{EntryKind, Observation};
    use std::time::{Duration, UNIX_EPOCH};

    fn snapshot(visited: bool) -> PathSnapshot {
        PathSnapshot::new(
            EntryKind::File,
            Observation::new(UNIX_EPOCH + Duration::from_secs(1), 0o644),
            visited,
        )
    }

    #[test]
    fn test_store_lookup_delete() {
        let cache = PathCache::new();
        let path = Path::new("/root/a.txt");

        assert!(cache.lookup(path).is_none());
        cache.store(path, snapshot(false));
        assert_eq!(cache.lookup(path), Some(snapshot(false)));
        assert_eq!(cache.delete(path), Some(snapshot(false)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_update_vacant_and_occupied() {
        let cache = PathCache::new();
        let path = Path::new("/root/a.txt");

        let existed = cache.update(path, |current| (snapshot(true), current.is_some()));
        assert!(!existed);
        let existed = cache.update(path, |current| (*current.unwrap(), current.is_some()));
        assert!(existed);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_for_each_mutates_and_removes() {
        let cache = PathCache::new();
        cache.store("/root/seen", snapshot(true));
        cache.store("/root/gone", snapshot(false));

        cache.for_each(|_, snap| {
            if snap.visited {
                Visit::Update(PathSnapshot {
                    visited: false,
                    ..*snap
                })
            } else {
                Visit::Remove
            }
        });

        assert_eq!(cache.len(), 1);
        assert!(!cache.lookup(Path::new("/root/seen")).unwrap().visited);
        assert!(cache.lookup(Path::new("/root/gone")).is_none());
    }

    #[test]
    fn test_for_each_stops_early() {
        let cache = PathCache::new();
        for i in 0..10 {
            cache.store(format!("/root/{i}"), snapshot(false));
        }

        let mut visited = 0;
        cache.for_each(|_, _| {
            visited += 1;
            if visited == 3 { Visit::Stop } else { Visit::Keep }
        });
        assert_eq!(visited, 3);
        assert_eq!(cache.len(), 10);
    }

    #[test]
    fn test_concurrent_stores() {
        let cache = PathCache::new();
        std::thread::scope(|s| {
            for t in 0..4 {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..100 {
                        cache.store(format!("/root/{t}/{i}"), snapshot(true));
                    }
                });
            }
        });
        assert_eq!(cache.len(), 400);
    }
}
