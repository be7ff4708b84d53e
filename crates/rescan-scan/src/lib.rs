//! Polling change-detection engine for rescan.
//!
//! This crate periodically walks a directory tree and reports what
//! changed since the previous pass as a stream of [`Event`]s.
//!
//! # Overview
//!
//! Each pass walks the root with jwalk, hands every accepted entry to a
//! pool of workers through a bounded intake queue, and classifies it
//! against a concurrent per-path cache:
//!
//! - **CREATE** for paths seen for the first time
//! - **PERM** and **MODIFY** for permission bit and modification time
//!   changes (both may fire for one entry)
//! - **DELETE** for cached paths the walk did not see, found by a sweep
//!   that runs once all workers have retired
//! - **ERROR** for entries that could not be read
//!
//! Options are shared through an `Arc` and may be changed at any time,
//! including while a pass is running.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use rescan_scan::{Options, ScanNotifier};
//! use tokio_util::sync::CancellationToken;
//!
//! let options = Options::shared();
//! options.set_max_workers(4).set_scan_interval(Duration::from_millis(500));
//!
//! let notifier = Arc::new(ScanNotifier::new("/path/to/watch", options).unwrap());
//! let events = notifier.queue();
//! std::thread::spawn(move || {
//!     for event in events {
//!         println!("{event}");
//!     }
//! });
//!
//! notifier.start(&CancellationToken::new()).unwrap();
//! ```

mod cache;
mod classify;
mod emit;
mod filter;
mod notifier;
mod stats;
mod walk;
mod worker;

pub use cache::{PathCache, Visit};
pub use classify::{classify, observe};
pub use filter::{Filter, FilterDecision};
pub use notifier::ScanNotifier;
pub use stats::PassStats;
pub use walk::{RawEntry, walk};
pub use worker::WorkerPool;

// Re-export core types for convenience
pub use rescan_core::{
    EntryKind, Event, EventKind, NotifierError, Observation, Options, PathSnapshot, WatchConfig,
};
