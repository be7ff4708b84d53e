//! Per-pass statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rescan_core::EventKind;

/// Summary of one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Pass number, starting at 1.
    pub pass: u64,
    /// Entries handed to the worker pool.
    pub accepted: u64,
    /// CREATE events emitted.
    pub created: u64,
    /// MODIFY events emitted.
    pub modified: u64,
    /// DELETE events emitted.
    pub deleted: u64,
    /// PERM events emitted.
    pub perm: u64,
    /// ERROR events emitted.
    pub errors: u64,
    /// NOCHANGE events emitted.
    pub unchanged: u64,
    /// Events dropped because the notifier was shutting down.
    pub abandoned: u64,
    /// Wall time of the walk, the worker drain and the deletion sweep.
    pub elapsed: Duration,
}

impl PassStats {
    /// Total events delivered to the queue.
    pub fn emitted(&self) -> u64 {
        self.created + self.modified + self.deleted + self.perm + self.errors + self.unchanged
    }
}

/// Counters shared by the workers of a pass.
#[derive(Debug, Default)]
pub(crate) struct PassCounters {
    accepted: AtomicU64,
    created: AtomicU64,
    modified: AtomicU64,
    deleted: AtomicU64,
    perm: AtomicU64,
    errors: AtomicU64,
    unchanged: AtomicU64,
    abandoned: AtomicU64,
}

impl PassCounters {
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_emitted(&self, kind: EventKind) {
        let counter = match kind {
            EventKind::Create => &self.created,
            EventKind::Modify => &self.modified,
            EventKind::Delete => &self.deleted,
            EventKind::Perm => &self.perm,
            EventKind::Error => &self.errors,
            EventKind::NoChange => &self.unchanged,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, pass: u64, elapsed: Duration) -> PassStats {
        PassStats {
            pass,
            accepted: self.accepted.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            modified: self.modified.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            perm: self.perm.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = PassCounters::default();
        counters.record_accepted();
        counters.record_accepted();
        counters.record_emitted(EventKind::Create);
        counters.record_emitted(EventKind::Delete);
        counters.record_abandoned();

        let stats = counters.snapshot(3, Duration::from_millis(5));
        assert_eq!(stats.pass, 3);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.emitted(), 2);
    }
}
