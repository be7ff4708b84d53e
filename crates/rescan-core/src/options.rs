//! Live-tunable notifier options.
//!
//! Every field is an independent cell: numeric, duration and boolean
//! fields are atomics, and each path pattern sits behind its own lock.
//! Setters take `&self` and return `&Self`, so one [`Arc<Options>`] can be
//! shared between the caller and a running notifier and tuned while a
//! pass is in progress. Readers always load the current value.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use regex::Regex;

use crate::{EventKind, NotifierError};

/// Default capacity of the intake and output queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;
/// Default number of workers per pass.
pub const DEFAULT_MAX_WORKERS: usize = 1;
/// Default pause between two passes.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct IgnoreFlags {
    errors: AtomicBool,
    no_change: AtomicBool,
    delete: AtomicBool,
    create: AtomicBool,
    modify: AtomicBool,
    perm: AtomicBool,
    files: AtomicBool,
    folders: AtomicBool,
    symlinks: AtomicBool,
    folder_content: AtomicBool,
}

impl Default for IgnoreFlags {
    fn default() -> Self {
        Self {
            errors: AtomicBool::new(false),
            no_change: AtomicBool::new(true),
            delete: AtomicBool::new(false),
            create: AtomicBool::new(false),
            modify: AtomicBool::new(false),
            perm: AtomicBool::new(false),
            files: AtomicBool::new(false),
            folders: AtomicBool::new(false),
            symlinks: AtomicBool::new(false),
            folder_content: AtomicBool::new(false),
        }
    }
}

/// Notifier options shared between the caller and the scanner.
#[derive(Debug)]
pub struct Options {
    queue_capacity: AtomicUsize,
    max_workers: AtomicUsize,
    scan_interval_nanos: AtomicU64,
    exclude: RwLock<Option<Regex>>,
    include: RwLock<Option<Regex>>,
    ignore: IgnoreFlags,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            queue_capacity: AtomicUsize::new(DEFAULT_QUEUE_CAPACITY),
            max_workers: AtomicUsize::new(DEFAULT_MAX_WORKERS),
            scan_interval_nanos: AtomicU64::new(duration_nanos(DEFAULT_SCAN_INTERVAL)),
            exclude: RwLock::new(None),
            include: RwLock::new(None),
            ignore: IgnoreFlags::default(),
        }
    }
}

impl Options {
    /// Create default options behind a shareable handle.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create options with exclude and include patterns.
    ///
    /// Empty patterns are treated as absent.
    pub fn with_patterns(
        exclude: Option<&str>,
        include: Option<&str>,
    ) -> Result<Arc<Self>, NotifierError> {
        let options = Self::default();
        options.set_exclude(compile(exclude)?);
        options.set_include(compile(include)?);
        Ok(Arc::new(options))
    }

    /// Set the capacity of the intake and output queues. Zero is ignored.
    ///
    /// Read once when a notifier is created.
    pub fn set_queue_capacity(&self, capacity: usize) -> &Self {
        if capacity > 0 {
            self.queue_capacity.store(capacity, Ordering::Relaxed);
        }
        self
    }

    /// Set the number of workers. Zero is ignored.
    ///
    /// Read once at the start of each pass.
    pub fn set_max_workers(&self, workers: usize) -> &Self {
        if workers > 0 {
            self.max_workers.store(workers, Ordering::Relaxed);
        }
        self
    }

    /// Set the pause between two passes.
    pub fn set_scan_interval(&self, interval: Duration) -> &Self {
        self.scan_interval_nanos
            .store(duration_nanos(interval), Ordering::Relaxed);
        self
    }

    /// Set the exclude pattern. An empty pattern clears it.
    ///
    /// Patterns are matched against absolute paths under the canonical
    /// root, with symlinks in the root itself resolved.
    pub fn set_exclude(&self, pattern: Option<Regex>) -> &Self {
        *self.exclude.write() = pattern.filter(|re| !re.as_str().is_empty());
        self
    }

    /// Set the include pattern. An empty pattern clears it.
    pub fn set_include(&self, pattern: Option<Regex>) -> &Self {
        *self.include.write() = pattern.filter(|re| !re.as_str().is_empty());
        self
    }

    /// Suppress ERROR events.
    pub fn set_ignore_errors(&self, ignore: bool) -> &Self {
        self.ignore.errors.store(ignore, Ordering::Relaxed);
        self
    }

    /// Suppress NOCHANGE events (suppressed by default).
    pub fn set_ignore_no_change(&self, ignore: bool) -> &Self {
        self.ignore.no_change.store(ignore, Ordering::Relaxed);
        self
    }

    /// Suppress DELETE events. Stale entries are still evicted.
    pub fn set_ignore_delete(&self, ignore: bool) -> &Self {
        self.ignore.delete.store(ignore, Ordering::Relaxed);
        self
    }

    /// Suppress CREATE events.
    pub fn set_ignore_create(&self, ignore: bool) -> &Self {
        self.ignore.create.store(ignore, Ordering::Relaxed);
        self
    }

    /// Suppress MODIFY events.
    pub fn set_ignore_modify(&self, ignore: bool) -> &Self {
        self.ignore.modify.store(ignore, Ordering::Relaxed);
        self
    }

    /// Suppress PERM events.
    pub fn set_ignore_perm(&self, ignore: bool) -> &Self {
        self.ignore.perm.store(ignore, Ordering::Relaxed);
        self
    }

    /// Skip regular files entirely.
    pub fn set_ignore_files(&self, ignore: bool) -> &Self {
        self.ignore.files.store(ignore, Ordering::Relaxed);
        self
    }

    /// Skip directory entries (their content is still scanned).
    pub fn set_ignore_folders(&self, ignore: bool) -> &Self {
        self.ignore.folders.store(ignore, Ordering::Relaxed);
        self
    }

    /// Skip symbolic links.
    pub fn set_ignore_symlinks(&self, ignore: bool) -> &Self {
        self.ignore.symlinks.store(ignore, Ordering::Relaxed);
        self
    }

    /// Do not descend into subdirectories of the root.
    pub fn set_ignore_folder_content(&self, ignore: bool) -> &Self {
        self.ignore.folder_content.store(ignore, Ordering::Relaxed);
        self
    }

    /// Current queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.load(Ordering::Relaxed)
    }

    /// Current worker count.
    pub fn max_workers(&self) -> usize {
        self.max_workers.load(Ordering::Relaxed)
    }

    /// Current pause between passes.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_nanos(self.scan_interval_nanos.load(Ordering::Relaxed))
    }

    /// Source of the exclude pattern, if any.
    pub fn exclude_pattern(&self) -> Option<String> {
        self.exclude.read().as_ref().map(|re| re.as_str().to_string())
    }

    /// Source of the include pattern, if any.
    pub fn include_pattern(&self) -> Option<String> {
        self.include.read().as_ref().map(|re| re.as_str().to_string())
    }

    /// Whether the exclude pattern is set and matches `path`.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.read().as_ref().is_some_and(|re| re.is_match(path))
    }

    /// Whether the include pattern is set and does not match `path`.
    pub fn is_not_included(&self, path: &str) -> bool {
        self.include.read().as_ref().is_some_and(|re| !re.is_match(path))
    }

    /// Whether events of `kind` are suppressed.
    pub fn suppresses(&self, kind: EventKind) -> bool {
        let flag = match kind {
            EventKind::Create => &self.ignore.create,
            EventKind::Modify => &self.ignore.modify,
            EventKind::Delete => &self.ignore.delete,
            EventKind::Perm => &self.ignore.perm,
            EventKind::Error => &self.ignore.errors,
            EventKind::NoChange => &self.ignore.no_change,
        };
        flag.load(Ordering::Relaxed)
    }

    /// Whether regular files are skipped.
    pub fn ignores_files(&self) -> bool {
        self.ignore.files.load(Ordering::Relaxed)
    }

    /// Whether directory entries are skipped.
    pub fn ignores_folders(&self) -> bool {
        self.ignore.folders.load(Ordering::Relaxed)
    }

    /// Whether symbolic links are skipped.
    pub fn ignores_symlinks(&self) -> bool {
        self.ignore.symlinks.load(Ordering::Relaxed)
    }

    /// Whether subdirectory content is skipped.
    pub fn ignores_folder_content(&self) -> bool {
        self.ignore.folder_content.load(Ordering::Relaxed)
    }
}

/// Compile an optional pattern, mapping empty strings to `None`.
pub(crate) fn compile(pattern: Option<&str>) -> Result<Option<Regex>, NotifierError> {
    match pattern {
        None | Some("") => Ok(None),
        Some(src) => Regex::new(src)
            .map(Some)
            .map_err(|source| NotifierError::InvalidPattern {
                pattern: src.to_string(),
                source,
            }),
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::shared();
        assert_eq!(options.queue_capacity(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(options.max_workers(), DEFAULT_MAX_WORKERS);
        assert_eq!(options.scan_interval(), DEFAULT_SCAN_INTERVAL);
        assert!(options.suppresses(EventKind::NoChange));
        assert!(!options.suppresses(EventKind::Create));
        assert!(options.exclude_pattern().is_none());
    }

    #[test]
    fn test_chained_setters() {
        let options = Options::shared();
        options
            .set_queue_capacity(64)
            .set_max_workers(4)
            .set_scan_interval(Duration::from_millis(250))
            .set_ignore_delete(true)
            .set_ignore_no_change(false);

        assert_eq!(options.queue_capacity(), 64);
        assert_eq!(options.max_workers(), 4);
        assert_eq!(options.scan_interval(), Duration::from_millis(250));
        assert!(options.suppresses(EventKind::Delete));
        assert!(!options.suppresses(EventKind::NoChange));
    }

    #[test]
    fn test_zero_counts_ignored() {
        let options = Options::shared();
        options.set_max_workers(0).set_queue_capacity(0);
        assert_eq!(options.max_workers(), DEFAULT_MAX_WORKERS);
        assert_eq!(options.queue_capacity(), DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_patterns() {
        let options = Options::with_patterns(Some(r"\.git/"), Some(r"\.rs$")).unwrap();
        assert!(options.is_excluded("/repo/.git/HEAD"));
        assert!(!options.is_excluded("/repo/src/lib.rs"));
        assert!(options.is_not_included("/repo/README.md"));
        assert!(!options.is_not_included("/repo/src/lib.rs"));
    }

    #[test]
    fn test_empty_patterns_are_absent() {
        let options = Options::with_patterns(Some(""), Some("")).unwrap();
        assert!(options.exclude_pattern().is_none());
        assert!(options.include_pattern().is_none());
        assert!(!options.is_not_included("/anything"));

        options.set_exclude(Regex::new("").ok());
        assert!(options.exclude_pattern().is_none());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Options::with_patterns(Some("(unclosed"), None).unwrap_err();
        assert!(matches!(err, NotifierError::InvalidPattern { .. }));
    }

    #[test]
    fn test_concurrent_updates() {
        let options = Options::shared();
        std::thread::scope(|s| {
            for i in 1..=8 {
                let options = &options;
                s.spawn(move || {
                    options.set_max_workers(i);
                    options.set_ignore_perm(i % 2 == 0);
                });
            }
        });
        assert!((1..=8).contains(&options.max_workers()));
    }
}
