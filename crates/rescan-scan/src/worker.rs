//! Worker pool draining the intake queue.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rescan_core::NotifierError;
use tracing::{debug, trace};

/// Pool of consumer threads, sized per pass.
///
/// The underlying rayon pool is kept between passes and rebuilt only
/// when the requested worker count changes.
#[derive(Debug, Default)]
pub struct WorkerPool {
    pool: Mutex<Option<Arc<ThreadPool>>>,
}

impl WorkerPool {
    /// Create an empty pool; threads are spawned on first use.
    pub fn new() -> Self {
        Self {
            pool: Mutex::new(None),
        }
    }

    /// Run one drain cycle.
    ///
    /// Spawns `workers` consumers that each pull items from `intake` and
    /// pass them to `handle`, runs `produce` on the calling thread, and
    /// returns only after every consumer has retired. A consumer retires
    /// once the intake is closed and empty, so `produce` must own (and
    /// drop) the last sender.
    pub fn drain<T, H, P>(
        &self,
        workers: usize,
        intake: Receiver<T>,
        handle: H,
        produce: P,
    ) -> Result<(), NotifierError>
    where
        T: Send,
        H: Fn(T) + Sync,
        P: FnOnce(),
    {
        let workers = workers.max(1);
        let pool = self.pool_for(workers)?;

        pool.in_place_scope(|scope| {
            for id in 0..workers {
                let intake = intake.clone();
                let handle = &handle;
                scope.spawn(move |_| {
                    let mut handled = 0u64;
                    for item in intake.iter() {
                        handle(item);
                        handled += 1;
                    }
                    trace!(worker = id, handled, "worker retired");
                });
            }
            drop(intake);
            produce();
        });

        Ok(())
    }

    /// Number of threads in the current pool, if one was built.
    pub fn size(&self) -> Option<usize> {
        self.pool.lock().as_ref().map(|pool| pool.current_num_threads())
    }

    fn pool_for(&self, workers: usize) -> Result<Arc<ThreadPool>, NotifierError> {
        let mut slot = self.pool.lock();
        if let Some(pool) = slot.as_ref() {
            if pool.current_num_threads() == workers {
                return Ok(Arc::clone(pool));
            }
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("rescan-worker-{i}"))
            .build()
            .map_err(|e| NotifierError::internal(format!("failed to build worker pool: {e}")))?;
        debug!(workers, "worker pool resized");

        let pool = Arc::new(pool);
        *slot = Some(Arc::clone(&pool));
        Ok(pool)
    }
}
