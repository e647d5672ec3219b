//! Run lifecycle: state, statistics, and the caller-facing [`RunHandle`].

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use scout_core::{RunId, Strategy};
use serde::Serialize;
use tracing::{error, info};

use crate::cancel::Cancellation;
use crate::results::ResultMap;

/// Lifecycle of a fetch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    /// Every worker drained its source.
    Completed,
    /// At least one worker stopped because the run was cancelled.
    Cancelled,
}

impl RunState {
    /// `true` once no worker will touch the result map again.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Cancelled)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::NotStarted => "not_started",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// State cell shared by the supervisor and every waiter.
#[derive(Debug)]
pub(crate) struct RunStatus {
    state: Mutex<RunState>,
    changed: Condvar,
}

impl RunStatus {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RunState::NotStarted),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn get(&self) -> RunState {
        *self.state.lock()
    }

    pub(crate) fn begin(&self) {
        let mut state = self.state.lock();
        if *state == RunState::NotStarted {
            *state = RunState::Running;
        }
    }

    /// Move to a terminal state. Only the first call has any effect; it
    /// returns `true` and wakes every waiter.
    pub(crate) fn finish(&self, terminal: RunState) -> bool {
        debug_assert!(terminal.is_terminal());
        let mut state = self.state.lock();
        if state.is_terminal() {
            return false;
        }
        *state = terminal;
        self.changed.notify_all();
        true
    }

    pub(crate) fn wait(&self) -> RunState {
        let mut state = self.state.lock();
        while !state.is_terminal() {
            self.changed.wait(&mut state);
        }
        *state
    }

    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Option<RunState> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.is_terminal() {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.is_terminal().then_some(*state)
    }
}

/// Live counters for a run.
#[derive(Debug)]
pub(crate) struct RunCounters {
    started: Instant,
    finished: OnceLock<Duration>,
    fetched: AtomicUsize,
    failed: AtomicUsize,
}

impl RunCounters {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            finished: OnceLock::new(),
            fetched: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn record_success(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Freeze the elapsed time at the moment the run ended.
    pub(crate) fn mark_finished(&self) -> Duration {
        *self.finished.get_or_init(|| self.started.elapsed())
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.finished
            .get()
            .copied()
            .unwrap_or_else(|| self.started.elapsed())
    }

    pub(crate) fn fetched(&self) -> usize {
        self.fetched.load(Ordering::Relaxed)
    }

    pub(crate) fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Point-in-time statistics for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub state: RunState,
    pub strategy: Strategy,
    pub workers: usize,
    /// Items submitted to the run after de-duplication.
    pub items: usize,
    /// Lookups finished so far, successful or not.
    pub fetched: usize,
    /// Lookups that failed and were stored as empty records.
    pub failed: usize,
    pub elapsed_ms: u64,
}

/// Caller-side handle to one fetch run.
///
/// Dropping the handle cancels the run if it is still going and waits for
/// the workers to wind down, which takes at most one in-flight lookup.
pub struct RunHandle {
    pub(crate) id: RunId,
    pub(crate) strategy: Strategy,
    pub(crate) workers: usize,
    pub(crate) items: usize,
    pub(crate) status: Arc<RunStatus>,
    pub(crate) cancel: Arc<Cancellation>,
    pub(crate) results: Arc<ResultMap>,
    pub(crate) counters: Arc<RunCounters>,
    pub(crate) supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl RunHandle {
    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    pub fn item_count(&self) -> usize {
        self.items
    }

    pub fn state(&self) -> RunState {
        self.status.get()
    }

    /// The map this run writes into.
    pub fn results(&self) -> &Arc<ResultMap> {
        &self.results
    }

    /// Ask every worker to stop after its current lookup.
    ///
    /// Safe to call any number of times, including after the run finished.
    pub fn cancel(&self) {
        if self.cancel.cancel() && !self.state().is_terminal() {
            info!(run_id = %self.id, "Cancellation requested");
        }
    }

    /// Block until the run is completed or cancelled.
    pub fn await_completion(&self) -> RunState {
        let state = self.status.wait();
        self.reap();
        state
    }

    /// Like [`await_completion`](Self::await_completion) but gives up after
    /// `timeout`, returning `None` if the run is still going.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<RunState> {
        let state = self.status.wait_timeout(timeout)?;
        self.reap();
        Some(state)
    }

    pub fn stats(&self) -> RunStats {
        RunStats {
            state: self.state(),
            strategy: self.strategy,
            workers: self.workers,
            items: self.items,
            fetched: self.counters.fetched(),
            failed: self.counters.failed(),
            elapsed_ms: self.counters.elapsed().as_millis() as u64,
        }
    }

    fn reap(&self) {
        let supervisor = self.supervisor.lock().take();
        if let Some(handle) = supervisor {
            if handle.join().is_err() {
                error!(run_id = %self.id, "Run supervisor panicked");
            }
        }
    }
}

impl fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunHandle")
            .field("id", &self.id)
            .field("strategy", &self.strategy)
            .field("workers", &self.workers)
            .field("items", &self.items)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if !self.state().is_terminal() {
            self.cancel();
        }
        self.reap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn finish_transitions_once() {
        let status = RunStatus::new();
        assert_eq!(status.get(), RunState::NotStarted);
        status.begin();
        assert_eq!(status.get(), RunState::Running);

        assert!(status.finish(RunState::Cancelled));
        assert!(!status.finish(RunState::Completed));
        assert_eq!(status.get(), RunState::Cancelled);
    }

    #[test]
    fn begin_after_finish_is_ignored() {
        let status = RunStatus::new();
        status.begin();
        status.finish(RunState::Completed);
        status.begin();
        assert_eq!(status.get(), RunState::Completed);
    }

    #[test]
    fn wait_wakes_on_finish() {
        let status = Arc::new(RunStatus::new());
        status.begin();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let status = Arc::clone(&status);
                thread::spawn(move || status.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        status.finish(RunState::Completed);

        for w in waiters {
            assert_eq!(w.join().unwrap(), RunState::Completed);
        }
    }

    #[test]
    fn wait_timeout_expires_while_running() {
        let status = RunStatus::new();
        status.begin();
        assert_eq!(status.wait_timeout(Duration::from_millis(20)), None);
    }

    #[test]
    fn counters_track_failures() {
        let counters = RunCounters::new();
        counters.record_success();
        counters.record_failure();
        assert_eq!(counters.fetched(), 2);
        assert_eq!(counters.failed(), 1);
    }

    #[test]
    fn elapsed_freezes_when_finished() {
        let counters = RunCounters::new();
        let frozen = counters.mark_finished();
        thread::sleep(Duration::from_millis(5));
        assert_eq!(counters.elapsed(), frozen);
        assert_eq!(counters.mark_finished(), frozen);
    }

    #[test]
    fn state_display() {
        assert_eq!(RunState::Completed.to_string(), "completed");
        assert!(RunState::Cancelled.is_terminal());
        assert!(!RunState::Running.is_terminal());
    }
}
