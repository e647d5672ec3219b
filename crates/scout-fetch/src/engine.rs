//! The [`FetchEngine`]: starts runs over a provider.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use scout_core::{Error, FetchConfig, Item, Result, RunId, Strategy};
use tracing::{debug, info};

use crate::cancel::Cancellation;
use crate::pool::{self, WorkerContext};
use crate::provider::{ItemCatalog, MetadataProvider};
use crate::results::ResultMap;
use crate::run::{RunCounters, RunHandle, RunStatus};
use crate::source::{JobSource, StaticPartition, StreamingQueue};

/// Starts fetch runs against one provider.
///
/// The engine itself holds no per-run state; every call to a `start_*`
/// method creates an independent run with its own workers, cancellation
/// signal, and (unless one is passed in) result map.
pub struct FetchEngine {
    provider: Arc<dyn MetadataProvider>,
    config: FetchConfig,
    cores: usize,
}

impl FetchEngine {
    pub fn new(provider: Arc<dyn MetadataProvider>, config: FetchConfig) -> Self {
        Self {
            provider,
            config,
            cores: num_cpus::get(),
        }
    }

    /// Override the detected logical core count used by the worker-count
    /// policy.
    pub fn with_cores(mut self, cores: usize) -> Self {
        self.cores = cores.max(1);
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Number of workers a run with `strategy` would use.
    pub fn worker_count(&self, strategy: Strategy) -> usize {
        self.config.worker_count(strategy, self.cores)
    }

    /// Start a run over `items` with a fresh result map.
    pub fn start_run(
        &self,
        items: impl IntoIterator<Item = Item>,
        strategy: Strategy,
    ) -> Result<RunHandle> {
        self.start_run_into(items, strategy, Arc::new(ResultMap::new()))
    }

    /// Enumerate `catalog` and start a run over its items.
    ///
    /// If enumeration fails, no worker is spawned and the failure is
    /// returned as [`Error::SourceEnumeration`].
    pub fn start_catalog_run(
        &self,
        catalog: &dyn ItemCatalog,
        strategy: Strategy,
    ) -> Result<RunHandle> {
        let items = catalog.list_items().map_err(|e| match e {
            Error::SourceEnumeration(_) => e,
            other => Error::SourceEnumeration(format!("{}: {other}", catalog.name())),
        })?;
        debug!(catalog = catalog.name(), items = items.len(), "Catalog enumerated");
        self.start_run(items, strategy)
    }

    /// Start a run that writes into an existing result map.
    ///
    /// Records already in `results` are kept; items fetched by this run
    /// overwrite them.
    pub fn start_run_into(
        &self,
        items: impl IntoIterator<Item = Item>,
        strategy: Strategy,
        results: Arc<ResultMap>,
    ) -> Result<RunHandle> {
        self.config.validate()?;

        let items = dedup(items);
        let item_count = items.len();
        let workers = self.worker_count(strategy);
        let run_id = RunId::new();
        let cancel = Arc::new(Cancellation::new());

        let (source, feeder): (Arc<dyn JobSource>, Option<thread::JoinHandle<usize>>) =
            match strategy {
                Strategy::StreamingQueue => {
                    let (queue, feeder) =
                        StreamingQueue::open(items, self.config.queue_capacity, &cancel)?;
                    let source: Arc<dyn JobSource> = Arc::new(queue);
                    (source, feeder)
                }
                Strategy::StaticPartition => {
                    let source: Arc<dyn JobSource> =
                        Arc::new(StaticPartition::new(items, workers));
                    (source, None)
                }
            };

        let status = Arc::new(RunStatus::new());
        let counters = Arc::new(RunCounters::new());
        let ctx = Arc::new(WorkerContext {
            run_id,
            source,
            provider: Arc::clone(&self.provider),
            results: Arc::clone(&results),
            cancel: Arc::clone(&cancel),
            counters: Arc::clone(&counters),
            call_timeout: self.config.call_timeout(),
        });

        status.begin();
        info!(
            run_id = %run_id,
            provider = self.provider.name(),
            strategy = %strategy,
            workers,
            items = item_count,
            "Fetch run started"
        );

        let handles = match pool::spawn_workers(&ctx, workers) {
            Ok(handles) => handles,
            Err(e) => {
                join_feeder(feeder);
                return Err(e);
            }
        };
        drop(ctx);

        let supervisor = {
            let status = Arc::clone(&status);
            let counters = Arc::clone(&counters);
            // Handles are parked outside the closure so they can still be
            // joined if the supervisor thread fails to start.
            let spawn_cancel = Arc::clone(&cancel);
            let pending = Arc::new(Mutex::new(Some((feeder, handles))));
            let pending_for_thread = Arc::clone(&pending);

            let spawned = thread::Builder::new()
                .name("scout-supervisor".into())
                .spawn(move || {
                    if let Some((feeder, handles)) = pending_for_thread.lock().take() {
                        pool::supervise(run_id, feeder, handles, &status, &counters);
                    }
                });

            match spawned {
                Ok(handle) => handle,
                Err(e) => {
                    spawn_cancel.cancel();
                    if let Some((feeder, handles)) = pending.lock().take() {
                        for handle in handles {
                            let _ = handle.join();
                        }
                        join_feeder(feeder);
                    }
                    return Err(Error::Internal(format!(
                        "failed to spawn run supervisor: {e}"
                    )));
                }
            }
        };

        Ok(RunHandle {
            id: run_id,
            strategy,
            workers,
            items: item_count,
            status,
            cancel,
            results,
            counters,
            supervisor: Mutex::new(Some(supervisor)),
        })
    }
}

fn join_feeder(feeder: Option<thread::JoinHandle<usize>>) {
    if let Some(feeder) = feeder {
        let _ = feeder.join();
    }
}

/// Drop repeated items, keeping the first occurrence and input order.
fn dedup(items: impl IntoIterator<Item = Item>) -> Vec<Item> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut dropped = 0usize;

    for item in items {
        if seen.insert(item.clone()) {
            unique.push(item);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        debug!(dropped, "Collapsed duplicate items");
    }
    unique
}
