//! Concurrent result aggregation.
//!
//! Workers write into a [`ResultMap`] while the presentation layer reads
//! from it. Records are immutable, reference-counted slices, so a write swaps
//! a whole record in under the shard lock and readers only ever see complete
//! records.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use scout_core::Item;
use serde::{Serialize, Serializer};

/// The metadata lines stored for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord(Arc<[String]>);

impl MetadataRecord {
    /// Create a record from an ordered list of lines.
    pub fn new(lines: Vec<String>) -> Self {
        Self(Arc::from(lines))
    }

    /// A record with no lines, used for failed lookups.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The stored lines, in provider order.
    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl Default for MetadataRecord {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<String>> for MetadataRecord {
    fn from(lines: Vec<String>) -> Self {
        Self::new(lines)
    }
}

impl Serialize for MetadataRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

/// Thread-safe map from item to its fetched record.
///
/// Internally sharded, so concurrent writers for different items rarely
/// contend. Callers never need extra locking.
#[derive(Debug, Default)]
pub struct ResultMap {
    records: DashMap<Item, MetadataRecord>,
}

impl ResultMap {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Store the record for `item`, replacing any previous one.
    ///
    /// Returns the record that was replaced. Last writer wins.
    pub fn store(&self, item: Item, record: MetadataRecord) -> Option<MetadataRecord> {
        self.records.insert(item, record)
    }

    /// Look up the record for `item`.
    pub fn load(&self, item: &str) -> Option<MetadataRecord> {
        self.records.get(item).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, item: &str) -> bool {
        self.records.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy out every record currently stored, ordered by item name.
    ///
    /// Safe to call during a run. Each entry is complete; entries written
    /// while the copy is in progress may or may not be included.
    pub fn snapshot(&self) -> BTreeMap<Item, MetadataRecord> {
        self.records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Drop all records.
    pub fn clear(&self) {
        self.records.clear();
    }
}
