//! Path and type filtering.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rescan_core::{EntryKind, Options};

/// What to do with a walked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Report the entry.
    Accept,
    /// Ignore the entry.
    Skip,
    /// Do not descend into the directory; `report` says whether the
    /// directory itself is still reported.
    SkipSubtree { report: bool },
}

impl FilterDecision {
    /// Whether the entry itself should be classified.
    pub fn accepts(self) -> bool {
        matches!(self, Self::Accept | Self::SkipSubtree { report: true })
    }

    /// Whether the directory's children must not be walked.
    pub fn prunes(self) -> bool {
        matches!(self, Self::SkipSubtree { .. })
    }
}

/// Applies the root rule, path patterns and per-type toggles.
///
/// Options are re-read on every call so the same entry gets the same
/// answer at seeding time, walk time and worker time as long as the
/// options are unchanged.
#[derive(Debug, Clone)]
pub struct Filter {
    root: PathBuf,
    options: Arc<Options>,
}

impl Filter {
    /// Create a filter for entries under `root`.
    pub fn new(root: impl Into<PathBuf>, options: Arc<Options>) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Decide what to do with `path` of type `kind`. First match wins.
    pub fn decide(&self, path: &Path, kind: EntryKind) -> FilterDecision {
        if kind == EntryKind::Unsupported {
            return FilterDecision::Skip;
        }
        if path == self.root || self.rejects_by_pattern(path) {
            return FilterDecision::Skip;
        }

        let options = &self.options;
        match kind {
            EntryKind::File if options.ignores_files() => FilterDecision::Skip,
            EntryKind::Directory if options.ignores_folder_content() => {
                FilterDecision::SkipSubtree {
                    report: !options.ignores_folders(),
                }
            }
            EntryKind::Directory if options.ignores_folders() => FilterDecision::Skip,
            EntryKind::Symlink if options.ignores_symlinks() => FilterDecision::Skip,
            _ => FilterDecision::Accept,
        }
    }

    /// Exclude and include pattern rules alone.
    ///
    /// Used for entries whose type is unknown because the walk failed.
    pub fn rejects_by_pattern(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.options.is_excluded(&text) || self.options.is_not_included(&text)
    }

    /// The root this filter is anchored at.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn filter() -> (Filter, Arc<Options>) {
        let options = Options::shared();
        (Filter::new("/watch", Arc::clone(&options)), options)
    }

    #[test]
    fn test_root_never_reported() {
        let (filter, _) = filter();
        assert_eq!(
            filter.decide(Path::new("/watch"), EntryKind::Directory),
            FilterDecision::Skip
        );
        assert!(filter.decide(Path::new("/watch/a"), EntryKind::Directory).accepts());
    }

    #[test]
    fn test_unsupported_skipped() {
        let (filter, _) = filter();
        assert_eq!(
            filter.decide(Path::new("/watch/sock"), EntryKind::Unsupported),
            FilterDecision::Skip
        );
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let (filter, options) = filter();
        options
            .set_exclude(Regex::new(r"secret").ok())
            .set_include(Regex::new(r"\.txt$").ok());

        let path = Path::new("/watch/secret.txt");
        assert_eq!(filter.decide(path, EntryKind::File), FilterDecision::Skip);
        assert!(filter.decide(Path::new("/watch/notes.txt"), EntryKind::File).accepts());
        assert!(!filter.decide(Path::new("/watch/notes.md"), EntryKind::File).accepts());
    }

    #[test]
    fn test_type_toggles() {
        let (filter, options) = filter();
        options.set_ignore_files(true).set_ignore_symlinks(true);

        assert!(!filter.decide(Path::new("/watch/f"), EntryKind::File).accepts());
        assert!(!filter.decide(Path::new("/watch/l"), EntryKind::Symlink).accepts());
        assert!(filter.decide(Path::new("/watch/d"), EntryKind::Directory).accepts());

        options.set_ignore_folders(true);
        assert_eq!(
            filter.decide(Path::new("/watch/d"), EntryKind::Directory),
            FilterDecision::Skip
        );
    }

    #[test]
    fn test_folder_content() {
        let (filter, options) = filter();
        options.set_ignore_folder_content(true);

        let decision = filter.decide(Path::new("/watch/d"), EntryKind::Directory);
        assert_eq!(decision, FilterDecision::SkipSubtree { report: true });
        assert!(decision.accepts());
        assert!(decision.prunes());

        options.set_ignore_folders(true);
        let decision = filter.decide(Path::new("/watch/d"), EntryKind::Directory);
        assert!(!decision.accepts());
        assert!(decision.prunes());

        // Files directly under the root are unaffected.
        assert!(filter.decide(Path::new("/watch/f"), EntryKind::File).accepts());
    }

    #[test]
    fn test_pattern_rules_alone() {
        let (filter, options) = filter();
        assert!(!filter.rejects_by_pattern(Path::new("/watch")));

        options.set_include(Regex::new(r"^/watch/keep").ok());
        assert!(filter.rejects_by_pattern(Path::new("/watch/drop")));
        assert!(!filter.rejects_by_pattern(Path::new("/watch/keep/x")));
    }

    #[test]
    fn test_decision_follows_live_options() {
        let (filter, options) = filter();
        let path = Path::new("/watch/a.log");
        assert!(filter.decide(path, EntryKind::File).accepts());

        options.set_exclude(Regex::new(r"\.log$").ok());
        assert!(!filter.decide(path, EntryKind::File).accepts());

        options.set_exclude(None);
        assert!(filter.decide(path, EntryKind::File).accepts());
    }
}
