//! Worker threads and the run supervisor.
//!
//! Each worker pulls jobs from the run's [`JobSource`] until it is told the
//! source is exhausted or the run was cancelled, calling the provider once
//! per job. The supervisor joins every worker and then settles the run's
//! terminal state exactly once.
//!
//! With a per-call deadline each worker owns a [`CallSlot`]: one reusable
//! thread that runs its lookups. A lookup past the deadline is recorded as
//! empty, and the worker waits for the slot before taking another job.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Receiver, RecvTimeoutError, Sender};
use scout_core::{Error, Item, Result, RunId};
use tracing::{debug, error, info, trace, warn};

use crate::cancel::Cancellation;
use crate::provider::MetadataProvider;
use crate::results::{MetadataRecord, ResultMap};
use crate::run::{RunCounters, RunState, RunStatus};
use crate::source::{Dispatch, JobSource};

/// Why a worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    Exhausted,
    Cancelled,
}

/// Everything a worker shares with the rest of its run.
pub(crate) struct WorkerContext {
    pub(crate) run_id: RunId,
    pub(crate) source: Arc<dyn JobSource>,
    pub(crate) provider: Arc<dyn MetadataProvider>,
    pub(crate) results: Arc<ResultMap>,
    pub(crate) cancel: Arc<Cancellation>,
    pub(crate) counters: Arc<RunCounters>,
    pub(crate) call_timeout: Option<Duration>,
}

/// Spawn `count` workers. On failure, the workers already started are
/// cancelled and joined before the error is returned.
pub(crate) fn spawn_workers(
    ctx: &Arc<WorkerContext>,
    count: usize,
) -> Result<Vec<JoinHandle<WorkerExit>>> {
    let mut handles = Vec::with_capacity(count);

    for idx in 0..count {
        let worker_ctx = Arc::clone(ctx);
        let spawned = thread::Builder::new()
            .name(format!("scout-worker-{idx}"))
            .spawn(move || run_worker(idx, &worker_ctx));

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                ctx.cancel.cancel();
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(Error::Internal(format!(
                    "failed to spawn worker {idx}: {e}"
                )));
            }
        }
    }

    Ok(handles)
}

fn run_worker(idx: usize, ctx: &WorkerContext) -> WorkerExit {
    debug!(run_id = %ctx.run_id, worker = idx, "Worker started");
    let mut processed = 0usize;
    let mut slot = ctx
        .call_timeout
        .map(|deadline| CallSlot::new(idx, Arc::clone(&ctx.provider), deadline));

    let exit = loop {
        // A lookup abandoned at its deadline still occupies this worker.
        if let Some(slot) = slot.as_mut() {
            if !slot.wait_idle(&ctx.cancel) {
                break WorkerExit::Cancelled;
            }
        }

        let job = match ctx.source.next_job(idx, &ctx.cancel) {
            Dispatch::Job(job) => job,
            Dispatch::Exhausted => break WorkerExit::Exhausted,
            Dispatch::Cancelled => break WorkerExit::Cancelled,
        };

        trace!(run_id = %ctx.run_id, worker = idx, item = %job.item, "Fetching");

        let fetched = match slot.as_mut() {
            Some(slot) => slot.call(&job.item),
            None => call_guarded(ctx.provider.as_ref(), &job.item),
        };

        let record = match fetched {
            Ok(lines) => {
                ctx.counters.record_success();
                MetadataRecord::new(lines)
            }
            Err(e) => {
                warn!(
                    run_id = %ctx.run_id,
                    worker = idx,
                    item = %job.item,
                    error = %e,
                    "Lookup failed; storing empty record"
                );
                ctx.counters.record_failure();
                MetadataRecord::empty()
            }
        };

        // A lookup that was already running when the run was cancelled
        // still gets its result stored.
        ctx.results.store(job.item, record);
        processed += 1;
    };

    // Dropping the slot waits for an abandoned lookup to return, so no
    // provider call outlives its worker.
    drop(slot);

    debug!(
        run_id = %ctx.run_id,
        worker = idx,
        processed,
        exit = ?exit,
        "Worker stopped"
    );
    exit
}

/// A worker's dedicated lookup thread, used when a per-call deadline is set.
///
/// The worker hands one item at a time to the thread and waits up to the
/// deadline for the answer. An expired lookup is reported as a provider
/// error, but the thread stays busy until the provider returns; the worker
/// must not take another job until then, which keeps at most one provider
/// call in flight per worker.
pub(crate) struct CallSlot {
    worker: usize,
    provider: Arc<dyn MetadataProvider>,
    deadline: Duration,
    requests: Option<Sender<Item>>,
    replies: Option<Receiver<Result<Vec<String>>>>,
    thread: Option<JoinHandle<()>>,
    busy: bool,
}

impl CallSlot {
    pub(crate) fn new(
        worker: usize,
        provider: Arc<dyn MetadataProvider>,
        deadline: Duration,
    ) -> Self {
        Self {
            worker,
            provider,
            deadline,
            requests: None,
            replies: None,
            thread: None,
            busy: false,
        }
    }

    /// Block until the previous lookup has returned. Returns `false` if the
    /// run was cancelled first.
    pub(crate) fn wait_idle(&mut self, cancel: &Cancellation) -> bool {
        if !self.busy {
            return true;
        }
        let Some(replies) = self.replies.clone() else {
            self.busy = false;
            return true;
        };

        select! {
            recv(replies) -> msg => {
                if msg.is_err() {
                    // The thread is gone; the next call starts a fresh one.
                    self.reset();
                }
                self.busy = false;
                true
            }
            recv(cancel.signal()) -> _ => false,
        }
    }

    /// Run one lookup bounded by the deadline. The slot must be idle.
    pub(crate) fn call(&mut self, item: &Item) -> Result<Vec<String>> {
        debug_assert!(!self.busy, "call on a busy slot");
        self.ensure_thread(item)?;

        let sent = self
            .requests
            .as_ref()
            .is_some_and(|requests| requests.send(item.clone()).is_ok());
        let replies = match (sent, self.replies.clone()) {
            (true, Some(replies)) => replies,
            _ => {
                self.reset();
                return Err(Error::provider(
                    item.as_str(),
                    "lookup thread exited without a result",
                ));
            }
        };

        match replies.recv_timeout(self.deadline) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                self.busy = true;
                Err(Error::provider(
                    item.as_str(),
                    format!("timed out after {:?}", self.deadline),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.reset();
                Err(Error::provider(
                    item.as_str(),
                    "lookup thread exited without a result",
                ))
            }
        }
    }

    fn ensure_thread(&mut self, item: &Item) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }

        let (req_tx, req_rx) = crossbeam_channel::bounded::<Item>(1);
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let provider = Arc::clone(&self.provider);

        let thread = thread::Builder::new()
            .name(format!("scout-call-{}", self.worker))
            .spawn(move || {
                for item in req_rx {
                    if reply_tx.send(call_guarded(provider.as_ref(), &item)).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| Error::provider(item.as_str(), format!("failed to spawn lookup: {e}")))?;

        self.requests = Some(req_tx);
        self.replies = Some(reply_rx);
        self.thread = Some(thread);
        Ok(())
    }

    /// Close the request channel and join the thread, waiting out any
    /// lookup still in progress.
    fn reset(&mut self) {
        self.requests = None;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        self.replies = None;
        self.busy = false;
    }
}

impl Drop for CallSlot {
    fn drop(&mut self) {
        self.reset();
    }
}

/// Call the provider, turning a panic into a provider error.
fn call_guarded(provider: &dyn MetadataProvider, item: &Item) -> Result<Vec<String>> {
    match panic::catch_unwind(AssertUnwindSafe(|| provider.fetch_provides(item))) {
        Ok(result) => result,
        Err(_) => Err(Error::provider(
            item.as_str(),
            format!("provider '{}' panicked", provider.name()),
        )),
    }
}

/// Join the feeder and every worker, then settle the run's terminal state.
///
/// The state becomes [`RunState::Cancelled`] if any worker stopped because
/// of cancellation, and [`RunState::Completed`] otherwise. Until this
/// returns, the run is still `Running`, so nobody treats the result map as
/// final while a straggler can still write to it.
pub(crate) fn supervise(
    run_id: RunId,
    feeder: Option<JoinHandle<usize>>,
    workers: Vec<JoinHandle<WorkerExit>>,
    status: &RunStatus,
    counters: &RunCounters,
) {
    let mut cancelled = false;

    for (idx, handle) in workers.into_iter().enumerate() {
        match handle.join() {
            Ok(WorkerExit::Exhausted) => {}
            Ok(WorkerExit::Cancelled) => cancelled = true,
            Err(_) => error!(run_id = %run_id, worker = idx, "Worker panicked"),
        }
    }

    if let Some(feeder) = feeder {
        if feeder.join().is_err() {
            error!(run_id = %run_id, "Feeder panicked");
        }
    }

    let terminal = if cancelled {
        RunState::Cancelled
    } else {
        RunState::Completed
    };

    let elapsed = counters.mark_finished();
    if status.finish(terminal) {
        info!(
            run_id = %run_id,
            state = %terminal,
            fetched = counters.fetched(),
            failed = counters.failed(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Fetch run finished"
        );
    }
}
