//! Broadcast cancellation signal.
//!
//! A [`Cancellation`] is shared by every thread of a run. Workers either poll
//! [`is_cancelled`](Cancellation::is_cancelled) or wait on
//! [`signal`](Cancellation::signal) inside a `select!`: the signal channel
//! never carries a message, it disconnects when the run is cancelled, which
//! wakes every receiver at once.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

/// Cooperative stop signal for one fetch run.
#[derive(Debug)]
pub struct Cancellation {
    fired: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (trigger, signal) = crossbeam_channel::bounded(0);
        Self {
            fired: AtomicBool::new(false),
            trigger: Mutex::new(Some(trigger)),
            signal,
        }
    }

    /// Fire the signal. Returns `true` only for the call that fired it;
    /// later calls are no-ops.
    pub fn cancel(&self) -> bool {
        // Flag first, so anyone woken by the disconnect sees it set.
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        drop(self.trigger.lock().take());
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Receiver that becomes ready (disconnected) once the run is cancelled.
    pub fn signal(&self) -> &Receiver<()> {
        &self.signal
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}
