//! Job sources: how items are handed to workers.
//!
//! Both strategies implement [`JobSource`], so the worker loop does not know
//! which one it is draining. Each item is dispatched exactly once.
//!
//! - [`StreamingQueue`] -- one shared bounded channel; workers compete for
//!   the next job, which balances uneven lookup latency.
//! - [`StaticPartition`] -- the list is cut into one contiguous slice per
//!   worker up front; no shared queue, but a slow slice holds up its worker.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};
use scout_core::{Error, Item, Result, Strategy};
use tracing::debug;

use crate::cancel::Cancellation;

/// One pending lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// The item to fetch.
    pub item: Item,
    /// Position of the item in the run's input list.
    pub seq: usize,
}

/// What a worker gets when it asks for more work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A job to process.
    Job(Job),
    /// Nothing left for this worker.
    Exhausted,
    /// The run was cancelled; stop without taking more work.
    Cancelled,
}

/// Yields jobs to workers until exhausted or cancelled.
pub trait JobSource: Send + Sync {
    /// The strategy this source implements.
    fn strategy(&self) -> Strategy;

    /// Hand the next job to `worker`, blocking until one is available, the
    /// source runs dry, or `cancel` fires.
    fn next_job(&self, worker: usize, cancel: &Cancellation) -> Dispatch;
}

fn into_jobs(items: Vec<Item>) -> impl Iterator<Item = Job> {
    items
        .into_iter()
        .enumerate()
        .map(|(seq, item)| Job { item, seq })
}

// ---------------------------------------------------------------------------
// Streaming queue
// ---------------------------------------------------------------------------

/// Shared bounded queue drained by all workers.
pub struct StreamingQueue {
    jobs: Receiver<Job>,
}

impl StreamingQueue {
    /// Enqueue `items` and close the queue.
    ///
    /// With no `capacity` (or one at least as large as the item list) every
    /// job is pushed before this returns. Otherwise a feeder thread pushes
    /// the jobs as space frees up and stops early if `cancel` fires; its
    /// handle is returned so the run can join it. The handle yields the
    /// number of jobs fed.
    pub fn open(
        items: Vec<Item>,
        capacity: Option<usize>,
        cancel: &Arc<Cancellation>,
    ) -> Result<(Self, Option<JoinHandle<usize>>)> {
        let total = items.len();
        let capacity = capacity.unwrap_or(total).max(1);
        let (tx, rx) = crossbeam_channel::bounded(capacity);

        if capacity >= total {
            for job in into_jobs(items) {
                // Room for every job, so this never blocks.
                tx.send(job)
                    .map_err(|e| Error::Internal(format!("job queue closed early: {e}")))?;
            }
            return Ok((Self { jobs: rx }, None));
        }

        let cancel = Arc::clone(cancel);
        let feeder = thread::Builder::new()
            .name("scout-feeder".into())
            .spawn(move || feed(tx, items, &cancel))
            .map_err(|e| Error::Internal(format!("failed to spawn feeder thread: {e}")))?;

        Ok((Self { jobs: rx }, Some(feeder)))
    }
}

fn feed(tx: Sender<Job>, items: Vec<Item>, cancel: &Cancellation) -> usize {
    let total = items.len();
    let mut fed = 0;

    for job in into_jobs(items) {
        select! {
            send(tx, job) -> res => {
                if res.is_err() {
                    break;
                }
                fed += 1;
            }
            recv(cancel.signal()) -> _ => break,
        }
    }

    debug!(fed, total, "Feeder finished");
    fed
}

impl JobSource for StreamingQueue {
    fn strategy(&self) -> Strategy {
        Strategy::StreamingQueue
    }

    fn next_job(&self, _worker: usize, cancel: &Cancellation) -> Dispatch {
        if cancel.is_cancelled() {
            return Dispatch::Cancelled;
        }

        let received = select! {
            recv(self.jobs) -> msg => msg.ok(),
            recv(cancel.signal()) -> _ => return Dispatch::Cancelled,
        };

        // select! picks at random when both are ready; never start a job
        // that was dequeued after the run was cancelled.
        if cancel.is_cancelled() {
            return Dispatch::Cancelled;
        }

        match received {
            Some(job) => Dispatch::Job(job),
            None => Dispatch::Exhausted,
        }
    }
}

// ---------------------------------------------------------------------------
// Static partition
// ---------------------------------------------------------------------------

/// Split `len` items into `parts` contiguous ranges.
///
/// Every range has `len / parts` items except the last, which also takes the
/// remainder. `parts` of zero is treated as one.
pub fn partition_bounds(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let chunk = len / parts;

    (0..parts)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == parts { len } else { start + chunk };
            start..end
        })
        .collect()
}

/// One fixed slice of jobs per worker.
pub struct StaticPartition {
    slices: Vec<Vec<Job>>,
    cursors: Vec<AtomicUsize>,
}

impl StaticPartition {
    /// Partition `items` across `workers` slices.
    pub fn new(items: Vec<Item>, workers: usize) -> Self {
        let bounds = partition_bounds(items.len(), workers);
        let mut jobs = into_jobs(items);

        let slices: Vec<Vec<Job>> = bounds
            .iter()
            .map(|range| jobs.by_ref().take(range.len()).collect())
            .collect();
        let cursors = slices.iter().map(|_| AtomicUsize::new(0)).collect();

        Self { slices, cursors }
    }

    /// Number of jobs assigned to each worker, in worker order.
    pub fn slice_lens(&self) -> Vec<usize> {
        self.slices.iter().map(Vec::len).collect()
    }
}

impl JobSource for StaticPartition {
    fn strategy(&self) -> Strategy {
        Strategy::StaticPartition
    }

    fn next_job(&self, worker: usize, cancel: &Cancellation) -> Dispatch {
        if cancel.is_cancelled() {
            return Dispatch::Cancelled;
        }

        let (Some(slice), Some(cursor)) = (self.slices.get(worker), self.cursors.get(worker))
        else {
            return Dispatch::Exhausted;
        };

        // Only the owning worker advances its cursor.
        let idx = cursor.fetch_add(1, Ordering::Relaxed);
        match slice.get(idx) {
            Some(job) => Dispatch::Job(job.clone()),
            None => Dispatch::Exhausted,
        }
    }
}
