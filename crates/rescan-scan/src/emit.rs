//! Delivery of events to the output queue.

use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TryRecvError};
use rescan_core::Event;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::stats::PassCounters;

/// How long a blocked send waits before re-checking for shutdown.
const SEND_RETRY: Duration = Duration::from_millis(50);

/// Sends events for one pass.
///
/// A full queue blocks the sender until the consumer catches up, unless
/// the notifier is stopped or cancelled, in which case the event is
/// dropped.
pub(crate) struct Emitter<'a> {
    events: Sender<Event>,
    stop: &'a Receiver<()>,
    cancel: &'a CancellationToken,
    counters: &'a PassCounters,
}

impl<'a> Emitter<'a> {
    pub fn new(
        events: Sender<Event>,
        stop: &'a Receiver<()>,
        cancel: &'a CancellationToken,
        counters: &'a PassCounters,
    ) -> Self {
        Self {
            events,
            stop,
            cancel,
            counters,
        }
    }

    /// Deliver `event`. Returns `false` if it was abandoned.
    pub fn emit(&self, event: Event) -> bool {
        let kind = event.kind;
        let mut pending = event;
        loop {
            match self.events.send_timeout(pending, SEND_RETRY) {
                Ok(()) => {
                    self.counters.record_emitted(kind);
                    trace!(%kind, "event queued");
                    return true;
                }
                Err(SendTimeoutError::Timeout(event)) => {
                    if self.shutting_down() {
                        warn!(path = %event.path.display(), %kind, "event abandoned during shutdown");
                        self.counters.record_abandoned();
                        return false;
                    }
                    pending = event;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    self.counters.record_abandoned();
                    return false;
                }
            }
        }
    }

    /// Whether a stop was requested or the caller's token was cancelled.
    pub fn shutting_down(&self) -> bool {
        matches!(self.stop.try_recv(), Err(TryRecvError::Disconnected)) || self.cancel.is_cancelled()
    }
}
