//! Serializable watch configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::options::{self, DEFAULT_MAX_WORKERS, DEFAULT_QUEUE_CAPACITY};
use crate::{NotifierError, Options};

/// Plain configuration for a notifier, suitable for config files.
///
/// Converted into live [`Options`] with [`WatchConfig::to_options`].
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct WatchConfig {
    /// Directory to watch.
    pub root: PathBuf,

    /// Capacity of the intake and output queues.
    #[builder(default = "DEFAULT_QUEUE_CAPACITY")]
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Workers per pass.
    #[builder(default = "DEFAULT_MAX_WORKERS")]
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Pause between passes, in milliseconds.
    #[builder(default = "1000")]
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,

    /// Regex of paths to exclude.
    #[builder(default)]
    #[serde(default)]
    pub exclude: Option<String>,

    /// Regex paths must match to be reported.
    #[builder(default)]
    #[serde(default)]
    pub include: Option<String>,

    #[builder(default)]
    #[serde(default)]
    pub ignore_errors: bool,

    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub ignore_no_change: bool,

    #[builder(default)]
    #[serde(default)]
    pub ignore_delete: bool,

    #[builder(default)]
    #[serde(default)]
    pub ignore_create: bool,

    #[builder(default)]
    #[serde(default)]
    pub ignore_modify: bool,

    #[builder(default)]
    #[serde(default)]
    pub ignore_perm: bool,

    #[builder(default)]
    #[serde(default)]
    pub ignore_files: bool,

    #[builder(default)]
    #[serde(default)]
    pub ignore_folders: bool,

    #[builder(default)]
    #[serde(default)]
    pub ignore_symlinks: bool,

    #[builder(default)]
    #[serde(default)]
    pub ignore_folder_content: bool,
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_scan_interval_ms() -> u64 {
    1000
}

impl WatchConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            Some(_) => {}
        }
        if self.max_workers == Some(0) {
            return Err("Worker count must be positive".to_string());
        }
        if self.queue_capacity == Some(0) {
            return Err("Queue capacity must be positive".to_string());
        }
        Ok(())
    }
}

impl WatchConfig {
    /// Create a new config builder.
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder::default()
    }

    /// Create a config with default options for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_workers: DEFAULT_MAX_WORKERS,
            scan_interval_ms: default_scan_interval_ms(),
            exclude: None,
            include: None,
            ignore_errors: false,
            ignore_no_change: true,
            ignore_delete: false,
            ignore_create: false,
            ignore_modify: false,
            ignore_perm: false,
            ignore_files: false,
            ignore_folders: false,
            ignore_symlinks: false,
            ignore_folder_content: false,
        }
    }

    /// Pause between passes.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    /// Build live options from this config.
    pub fn to_options(&self) -> Result<Arc<Options>, NotifierError> {
        if self.max_workers == 0 || self.queue_capacity == 0 {
            return Err(NotifierError::InvalidConfig {
                message: "worker count and queue capacity must be positive".to_string(),
            });
        }

        let opts = Options::shared();
        opts.set_queue_capacity(self.queue_capacity)
            .set_max_workers(self.max_workers)
            .set_scan_interval(self.scan_interval())
            .set_exclude(options::compile(self.exclude.as_deref())?)
            .set_include(options::compile(self.include.as_deref())?)
            .set_ignore_errors(self.ignore_errors)
            .set_ignore_no_change(self.ignore_no_change)
            .set_ignore_delete(self.ignore_delete)
            .set_ignore_create(self.ignore_create)
            .set_ignore_modify(self.ignore_modify)
            .set_ignore_perm(self.ignore_perm)
            .set_ignore_files(self.ignore_files)
            .set_ignore_folders(self.ignore_folders)
            .set_ignore_symlinks(self.ignore_symlinks)
            .set_ignore_folder_content(self.ignore_folder_content);
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventKind;

    #[test]
    fn test_config_builder() {
        let config = WatchConfig::builder()
            .root("/srv/data")
            .max_workers(4usize)
            .scan_interval_ms(250u64)
            .exclude(Some(r"\.tmp$".to_string()))
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/srv/data"));
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(config.ignore_no_change);
    }

    #[test]
    fn test_builder_requires_root() {
        assert!(WatchConfig::builder().build().is_err());
        assert!(WatchConfig::builder().root("").build().is_err());
    }

    #[test]
    fn test_builder_rejects_zero_workers() {
        let result = WatchConfig::builder()
            .root("/srv")
            .max_workers(0usize)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_to_options() {
        let mut config = WatchConfig::new("/srv");
        config.max_workers = 3;
        config.ignore_perm = true;
        config.include = Some(r"\.log$".to_string());

        let options = config.to_options().unwrap();
        assert_eq!(options.max_workers(), 3);
        assert!(options.suppresses(EventKind::Perm));
        assert!(options.suppresses(EventKind::NoChange));
        assert_eq!(options.include_pattern().as_deref(), Some(r"\.log$"));
    }

    #[test]
    fn test_to_options_bad_pattern() {
        let mut config = WatchConfig::new("/srv");
        config.exclude = Some("[".to_string());
        assert!(matches!(
            config.to_options(),
            Err(NotifierError::InvalidPattern { .. })
        ));
    }
}
