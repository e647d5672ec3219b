//! # scout-fetch
//!
//! Concurrent metadata fetch engine.
//!
//! Given a list of [`Item`]s and a [`MetadataProvider`], the engine fans the
//! lookups out over a bounded pool of OS threads and collects the results in
//! a shared [`ResultMap`] that can be read while the run is in progress.
//!
//! This crate provides:
//!
//! - **Provider contract** ([`MetadataProvider`], [`ItemCatalog`]) -- the
//!   blocking lookup the workers call, and the source of the item list.
//! - **Job sources** ([`StreamingQueue`], [`StaticPartition`]) -- the two
//!   dispatch strategies behind one [`JobSource`] trait.
//! - **Cancellation** ([`Cancellation`]) -- a broadcast stop signal.
//! - **Result aggregation** ([`ResultMap`], [`MetadataRecord`]).
//! - **Runs** ([`FetchEngine`], [`RunHandle`], [`RunState`]) -- start, cancel
//!   and await a fetch run.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use scout_core::{FetchConfig, Item, Strategy};
//! use scout_fetch::{FetchEngine, MetadataProvider};
//!
//! struct Echo;
//!
//! impl MetadataProvider for Echo {
//!     fn name(&self) -> &'static str {
//!         "echo"
//!     }
//!
//!     fn fetch_provides(&self, item: &Item) -> scout_core::Result<Vec<String>> {
//!         Ok(vec![format!("so:{item}")])
//!     }
//! }
//!
//! let engine = FetchEngine::new(Arc::new(Echo), FetchConfig::default());
//! let run = engine
//!     .start_run(["curl", "zlib"].map(Item::from), Strategy::StreamingQueue)
//!     .unwrap();
//! run.await_completion();
//! assert_eq!(run.results().len(), 2);
//! ```

pub mod cancel;
pub mod engine;
mod pool;
pub mod provider;
pub mod results;
pub mod run;
pub mod source;

pub use cancel::Cancellation;
pub use engine::FetchEngine;
pub use provider::{ItemCatalog, MetadataProvider};
pub use results::{MetadataRecord, ResultMap};
pub use run::{RunHandle, RunState, RunStats};
pub use source::{partition_bounds, Dispatch, Job, JobSource, StaticPartition, StreamingQueue};

pub use scout_core::{Error, FetchConfig, Item, Result, RunId, Strategy};
