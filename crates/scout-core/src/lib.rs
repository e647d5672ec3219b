//! scout-core: shared types, IDs, errors, and fetch configuration.
//!
//! This crate is the foundational dependency for the other apkscout crates,
//! providing the [`Item`] and [`RunId`] identifiers, a unified error type,
//! the dispatch [`Strategy`] enum, and [`FetchConfig`] with its worker-count
//! policy.

pub mod config;
pub mod error;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use config::{FetchConfig, Strategy};
pub use error::{Error, Result};
pub use ids::{Item, RunId};
