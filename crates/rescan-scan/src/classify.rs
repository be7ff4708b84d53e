//! Change classification against the path cache.

use std::path::Path;

use rescan_core::{EntryKind, EventKind, Observation, Options, PathSnapshot};

use crate::cache::PathCache;

/// Read the compared metadata of `path` without following symlinks.
pub fn observe(path: &Path) -> std::io::Result<Observation> {
    std::fs::symlink_metadata(path).map(|metadata| Observation::from_metadata(&metadata))
}

/// Compare a fresh observation of `path` with its cached snapshot.
///
/// Updates the cache and returns the event kinds to emit, already
/// filtered by the suppression flags. Detection itself never depends on
/// suppression: a suppressed MODIFY still refreshes the cached time.
///
/// - unseen path: stored as visited, CREATE;
/// - permission bits differ: PERM;
/// - modification time differs: MODIFY (independent of PERM);
/// - neither: NOCHANGE.
pub fn classify(
    cache: &PathCache,
    path: &Path,
    entry: EntryKind,
    observed: Observation,
    options: &Options,
) -> Vec<EventKind> {
    let detected = cache.update(path, |current| match current {
        None => (
            PathSnapshot::new(entry, observed, true),
            vec![EventKind::Create],
        ),
        Some(previous) => {
            let mut kinds = Vec::with_capacity(2);
            if previous.permissions != observed.permissions {
                kinds.push(EventKind::Perm);
            }
            if previous.modified != observed.modified {
                kinds.push(EventKind::Modify);
            }
            if kinds.is_empty() {
                kinds.push(EventKind::NoChange);
            }
            (PathSnapshot::new(entry, observed, true), kinds)
        }
    });

    detected
        .into_iter()
        .filter(|kind| !options.suppresses(*kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_unseen_path_is_created() {
        let cache = PathCache::new();
        let options = Options::shared();
        let path = Path::new("/watch/a.txt");

        let kinds = classify(&cache, path, EntryKind::File, Observation::new(at(1), 0o644), &options);
        assert_eq!(kinds, vec![EventKind::Create]);
        assert!(cache.lookup(path).unwrap().visited);
    }

    #[test]
    fn test_mtime_change_is_modify() {
        let cache = PathCache::new();
        let options = Options::shared();
        let path = Path::new("/watch/a.txt");
        cache.store(path, PathSnapshot::new(EntryKind::File, Observation::new(at(1), 0o644), false));

        let kinds = classify(&cache, path, EntryKind::File, Observation::new(at(2), 0o644), &options);
        assert_eq!(kinds, vec![EventKind::Modify]);

        let cached = cache.lookup(path).unwrap();
        assert_eq!(cached.modified, at(2));
        assert!(cached.visited);
    }

    #[test]
    fn test_perm_and_modify_both_fire() {
        let cache = PathCache::new();
        let options = Options::shared();
        let path = Path::new("/watch/a.txt");
        cache.store(path, PathSnapshot::new(EntryKind::File, Observation::new(at(1), 0o644), false));

        let kinds = classify(&cache, path, EntryKind::File, Observation::new(at(5), 0o600), &options);
        assert_eq!(kinds, vec![EventKind::Perm, EventKind::Modify]);
        assert_eq!(cache.lookup(path).unwrap().permissions, 0o600);
    }

    #[test]
    fn test_no_change_suppressed_by_default() {
        let cache = PathCache::new();
        let options = Options::shared();
        let path = Path::new("/watch/a.txt");
        let observed = Observation::new(at(1), 0o644);
        cache.store(path, PathSnapshot::new(EntryKind::File, observed, false));

        assert!(classify(&cache, path, EntryKind::File, observed, &options).is_empty());
        assert!(cache.lookup(path).unwrap().visited);

        options.set_ignore_no_change(false);
        assert_eq!(
            classify(&cache, path, EntryKind::File, observed, &options),
            vec![EventKind::NoChange]
        );
    }

    #[test]
    fn test_suppressed_change_still_updates_cache() {
        let cache = PathCache::new();
        let options = Options::shared();
        options.set_ignore_modify(true).set_ignore_create(true);
        let path = Path::new("/watch/a.txt");

        assert!(classify(&cache, path, EntryKind::File, Observation::new(at(1), 0o644), &options).is_empty());
        assert!(cache.lookup(path).is_some());

        assert!(classify(&cache, path, EntryKind::File, Observation::new(at(2), 0o644), &options).is_empty());
        assert_eq!(cache.lookup(path).unwrap().modified, at(2));
    }

    #[test]
    fn test_observe_missing_path() {
        let err = observe(Path::new("/definitely/not/here/rescan")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
