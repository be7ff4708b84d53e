//! Polling scan notifier: lifecycle, scan loop and deletion sweep.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use parking_lot::Mutex;
use rescan_core::{Event, EventKind, NotifierError, Options, PathSnapshot};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::cache::{PathCache, Visit};
use crate::classify::{classify, observe};
use crate::emit::Emitter;
use crate::filter::Filter;
use crate::stats::{PassCounters, PassStats};
use crate::walk::{RawEntry, walk};
use crate::worker::WorkerPool;

/// Capacity of the pass statistics broadcast.
const STATS_CHANNEL_SIZE: usize = 16;

/// Periodically rescans a directory tree and reports what changed.
///
/// # Lifecycle
///
/// `new` seeds the cache and leaves the notifier ready. [`start`] blocks
/// the calling thread and runs passes until [`stop`] is called from
/// another thread or the cancellation token fires. A stopped notifier is
/// torn down for good: its queue is closed and it cannot be restarted.
///
/// Every other method is non-blocking and may be called concurrently
/// with a running scan loop, so the notifier is usually shared through
/// an [`Arc`].
///
/// [`start`]: ScanNotifier::start
/// [`stop`]: ScanNotifier::stop
#[derive(Debug)]
pub struct ScanNotifier {
    root: PathBuf,
    options: Arc<Options>,
    filter: Filter,
    cache: PathCache,
    pool: WorkerPool,
    intake_capacity: usize,
    events_tx: Mutex<Option<Sender<Event>>>,
    events_rx: Receiver<Event>,
    stop_tx: Mutex<Option<Sender<()>>>,
    stop_rx: Receiver<()>,
    stats_tx: broadcast::Sender<PassStats>,
    passes: AtomicU64,
    /// Held across every state transition so checks and updates of the
    /// flags below never interleave with teardown.
    lifecycle: Mutex<()>,
    ready: AtomicBool,
    running: AtomicBool,
    stopping: AtomicBool,
    paused: AtomicBool,
}

impl ScanNotifier {
    /// Create a notifier for `root`.
    ///
    /// The root must be an accessible directory. Its content is walked
    /// once to seed the cache, so items already present are not reported
    /// as created on the first pass. Queues are sized from
    /// [`Options::queue_capacity`].
    ///
    /// The root is canonicalized. Every event path, and every path matched
    /// against the exclude and include patterns, starts with the canonical
    /// root rather than the path given here. If `root` is or passes through
    /// a symlink (`/tmp` on macOS resolves to `/private/tmp`), patterns
    /// anchored on the given spelling will not match; anchor them on
    /// [`ScanNotifier::root`] instead.
    ///
    /// # Errors
    ///
    /// [`NotifierError::InvalidRoot`] or [`NotifierError::NotADirectory`]
    /// for a bad root, [`NotifierError::Initialization`] if the seeding
    /// walk fails.
    pub fn new(root: impl AsRef<Path>, options: Arc<Options>) -> Result<Self, NotifierError> {
        let given = root.as_ref();
        let metadata = std::fs::metadata(given).map_err(|e| NotifierError::invalid_root(given, e))?;
        if !metadata.is_dir() {
            return Err(NotifierError::NotADirectory {
                path: given.to_path_buf(),
            });
        }
        let root = given
            .canonicalize()
            .map_err(|e| NotifierError::invalid_root(given, e))?;

        let filter = Filter::new(&root, Arc::clone(&options));
        let cache = PathCache::new();
        seed(&filter, &cache)?;

        let capacity = options.queue_capacity();
        let (events_tx, events_rx) = bounded(capacity);
        let (stop_tx, stop_rx) = bounded(1);
        let (stats_tx, _) = broadcast::channel(STATS_CHANNEL_SIZE);

        info!(root = %root.display(), tracked = cache.len(), "scan notifier ready");

        Ok(Self {
            root,
            options,
            filter,
            cache,
            pool: WorkerPool::new(),
            intake_capacity: capacity,
            events_tx: Mutex::new(Some(events_tx)),
            events_rx,
            stop_tx: Mutex::new(Some(stop_tx)),
            stop_rx,
            stats_tx,
            passes: AtomicU64::new(0),
            lifecycle: Mutex::new(()),
            ready: AtomicBool::new(true),
            running: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        })
    }

    /// Receiving end of the event queue.
    ///
    /// Every call returns a handle to the same queue; each event goes to
    /// exactly one receiver. The queue disconnects after teardown once
    /// buffered events are drained.
    pub fn queue(&self) -> Receiver<Event> {
        self.events_rx.clone()
    }

    /// Subscribe to per-pass statistics.
    pub fn subscribe(&self) -> broadcast::Receiver<PassStats> {
        self.stats_tx.subscribe()
    }

    /// Run the scan loop on the calling thread until stopped or cancelled.
    ///
    /// `cancel` is checked once per iteration; a pass in progress always
    /// completes first.
    pub fn start(&self, cancel: &CancellationToken) -> Result<(), NotifierError> {
        {
            let _guard = self.lifecycle.lock();
            if self.is_running() {
                return Err(NotifierError::AlreadyStarted);
            }
            if self.is_stopping() {
                return Err(NotifierError::Stopping);
            }
            if !self.ready.load(Ordering::SeqCst) {
                return Err(NotifierError::NotReady);
            }
            self.running.store(true, Ordering::SeqCst);
        }

        info!(root = %self.root.display(), "scan notifier started");
        self.scan_loop(cancel);
        Ok(())
    }

    /// Ask the scan loop to exit after the current pass.
    pub fn stop(&self) -> Result<(), NotifierError> {
        let _guard = self.lifecycle.lock();
        if self.is_stopping() {
            return Err(NotifierError::Stopping);
        }
        if !self.is_running() {
            return Err(NotifierError::NotRunning);
        }
        self.stopping.store(true, Ordering::SeqCst);
        self.stop_tx.lock().take();
        debug!("stop requested");
        Ok(())
    }

    /// Skip passes until [`resume`](ScanNotifier::resume) is called.
    pub fn pause(&self) -> Result<(), NotifierError> {
        let _guard = self.lifecycle.lock();
        if self.is_stopping() {
            return Err(NotifierError::Stopping);
        }
        if !self.is_running() {
            return Err(NotifierError::NotRunning);
        }
        self.paused.store(true, Ordering::SeqCst);
        debug!("scan notifier paused");
        Ok(())
    }

    /// Resume passes after a pause.
    pub fn resume(&self) -> Result<(), NotifierError> {
        let _guard = self.lifecycle.lock();
        if self.is_stopping() {
            return Err(NotifierError::Stopping);
        }
        if self.paused.swap(false, Ordering::SeqCst) {
            debug!("scan notifier resumed");
        }
        Ok(())
    }

    /// Forget every cached snapshot.
    ///
    /// Each item still present is reported as CREATE on the next pass.
    /// Items removed before that pass are not reported as deleted.
    pub fn flush(&self) {
        self.cache.clear();
    }

    /// Whether the scan loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether passes are currently skipped.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared options handle.
    pub fn options(&self) -> &Arc<Options> {
        &self.options
    }

    /// Number of tracked paths.
    pub fn tracked(&self) -> usize {
        self.cache.len()
    }

    fn scan_loop(&self, cancel: &CancellationToken) {
        loop {
            if self.stop_signalled() || cancel.is_cancelled() {
                break;
            }

            if self.is_paused() {
                trace!("paused, skipping pass");
            } else {
                match self.run_pass(cancel) {
                    Ok(stats) => {
                        debug!(
                            pass = stats.pass,
                            accepted = stats.accepted,
                            emitted = stats.emitted(),
                            abandoned = stats.abandoned,
                            elapsed_ms = stats.elapsed.as_millis() as u64,
                            "pass complete"
                        );
                        let _ = self.stats_tx.send(stats);
                    }
                    Err(err) => error!(%err, "pass failed"),
                }
            }

            match self.stop_rx.recv_timeout(self.options.scan_interval()) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.teardown();
    }

    /// One full pass: walk, drain the workers, then sweep.
    fn run_pass(&self, cancel: &CancellationToken) -> Result<PassStats, NotifierError> {
        let started = Instant::now();
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(events) = self.events_tx.lock().clone() else {
            return Err(NotifierError::NotReady);
        };

        let counters = PassCounters::default();
        let emitter = Emitter::new(events, &self.stop_rx, cancel, &counters);
        let workers = self.options.max_workers();
        let (intake_tx, intake_rx) = bounded::<RawEntry>(self.intake_capacity);

        let counted = &counters;
        self.pool.drain(
            workers,
            intake_rx,
            |raw| self.process(raw, &emitter),
            move || {
                walk(&self.filter, |raw| {
                    counted.record_accepted();
                    match intake_tx.send(raw) {
                        Ok(()) => ControlFlow::Continue(()),
                        Err(_) => ControlFlow::Break(()),
                    }
                });
            },
        )?;

        self.sweep(&emitter);
        Ok(counters.snapshot(pass, started.elapsed()))
    }

    /// Classify one walked entry and emit the resulting events.
    fn process(&self, raw: RawEntry, emitter: &Emitter<'_>) {
        let RawEntry { path, kind, error } = raw;

        if let Some(err) = error {
            if !self.filter.rejects_by_pattern(&path) && !self.options.suppresses(EventKind::Error) {
                emitter.emit(Event::error(path, kind, err));
            }
            return;
        }

        // Options may have changed since the walk accepted this entry.
        if !self.filter.decide(&path, kind).accepts() {
            return;
        }

        match observe(&path) {
            Ok(observed) => {
                for event_kind in classify(&self.cache, &path, kind, observed, &self.options) {
                    emitter.emit(Event::new(path.clone(), kind, event_kind));
                }
            }
            Err(err) => {
                if !self.options.suppresses(EventKind::Error) {
                    emitter.emit(Event::error(path, kind, err));
                }
            }
        }
    }

    /// Report and evict entries not seen this pass, reset the rest.
    ///
    /// Runs even when DELETE events are suppressed so the cache never
    /// keeps stale paths or stale visited flags.
    fn sweep(&self, emitter: &Emitter<'_>) {
        self.cache.for_each(|path, snapshot| {
            if emitter.shutting_down() {
                return Visit::Stop;
            }
            if snapshot.visited {
                return Visit::Update(PathSnapshot {
                    visited: false,
                    ..*snapshot
                });
            }
            if !self.options.suppresses(EventKind::Delete) {
                emitter.emit(Event::new(path, snapshot.kind, EventKind::Delete));
            }
            Visit::Remove
        });
    }

    fn stop_signalled(&self) -> bool {
        matches!(self.stop_rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    fn teardown(&self) {
        let _guard = self.lifecycle.lock();
        self.stopping.store(true, Ordering::SeqCst);
        self.stop_tx.lock().take();
        self.events_tx.lock().take();
        self.cache.clear();
        self.ready.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.stopping.store(false, Ordering::SeqCst);
        info!(
            root = %self.root.display(),
            passes = self.passes.load(Ordering::SeqCst),
            "scan notifier stopped"
        );
    }
}

/// Populate the cache from an initial walk. Entries start unvisited.
fn seed(filter: &Filter, cache: &PathCache) -> Result<(), NotifierError> {
    let mut failure = None;
    walk(filter, |raw| match seed_entry(cache, raw) {
        Ok(()) => ControlFlow::Continue(()),
        Err(err) => {
            failure = Some(err);
            ControlFlow::Break(())
        }
    });
    failure.map_or(Ok(()), Err)
}

/// Record one walked entry. A walk failure aborts seeding; an entry that
/// vanished before its metadata was read is skipped.
fn seed_entry(cache: &PathCache, raw: RawEntry) -> Result<(), NotifierError> {
    if let Some(source) = raw.error {
        return Err(NotifierError::Initialization {
            path: raw.path,
            source,
        });
    }
    if let Ok(observed) = observe(&raw.path) {
        cache.store(raw.path, PathSnapshot::new(raw.kind, observed, false));
    }
    Ok(())
}
