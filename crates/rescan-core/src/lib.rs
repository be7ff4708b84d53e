//! Core types for rescan.
//!
//! This crate provides the data model shared by the scanning engine and
//! its consumers: change events, per-path snapshots, live-tunable options,
//! serializable configuration and the error type.

mod config;
mod error;
mod event;
mod options;
mod snapshot;

pub use config::{WatchConfig, WatchConfigBuilder};
pub use error::NotifierError;
pub use event::{EntryKind, Event, EventKind};
pub use options::{DEFAULT_MAX_WORKERS, DEFAULT_QUEUE_CAPACITY, DEFAULT_SCAN_INTERVAL, Options};
pub use snapshot::{Observation, PathSnapshot};
