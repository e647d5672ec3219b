//! The [`MetadataProvider`] and [`ItemCatalog`] traits.
//!
//! Both are blocking by contract. The engine calls a provider from several
//! worker threads at once, so implementations must be `Send + Sync` and must
//! not rely on shared mutable state between calls.

use scout_core::{Item, Result};

/// A lookup that resolves an item to its metadata lines.
///
/// Lookups are expected to be slow (a process spawn per call) and have no
/// timeout of their own. A failed lookup is reported as an error; the engine
/// records it as an empty result and carries on with the rest of the run.
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"apk"`).
    fn name(&self) -> &'static str;

    /// Fetch the "provides" lines for `item`.
    ///
    /// The returned lines keep the order the backend produced them in. An
    /// empty vector is a valid answer.
    fn fetch_provides(&self, item: &Item) -> Result<Vec<String>>;
}

/// Produces the item list a run is seeded with.
pub trait ItemCatalog: Send + Sync {
    /// Short, lowercase identifier for this catalog.
    fn name(&self) -> &'static str;

    /// Enumerate every item. Order is kept for display.
    fn list_items(&self) -> Result<Vec<Item>>;
}
