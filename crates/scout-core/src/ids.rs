//! Identifier types shared across the workspace.
//!
//! [`Item`] names a unit of work (a package) and is cheap to clone across
//! worker threads. [`RunId`] is a newtype over `Uuid` tagging one fetch run.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque item identifier, e.g. a package name.
///
/// Backed by an `Arc<str>` so the same name can be handed to the job queue,
/// a worker, and the result map without copying the string. Hashing and
/// ordering delegate to the underlying `str`, so maps keyed by `Item` can be
/// queried with a plain `&str`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item(Arc<str>);

impl Item {
    /// Create an item from anything string-like.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Borrow the item name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Item {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Item {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Item {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Item::from)
    }
}

/// Identifier of a single fetch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return the inner UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn item_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(Item::from("curl"), 1);
        assert_eq!(map.get("curl"), Some(&1));
        assert_eq!(map.get("zlib"), None);
    }

    #[test]
    fn item_display_and_debug() {
        let item = Item::from(String::from("curl-dev"));
        assert_eq!(item.to_string(), "curl-dev");
        assert_eq!(format!("{item:?}"), "\"curl-dev\"");
    }

    #[test]
    fn item_serializes_as_plain_string() {
        let item = Item::from("musl");
        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(json, "\"musl\"");
        let back: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn item_ordering_matches_str() {
        let mut items = vec![Item::from("zlib"), Item::from("curl"), Item::from("musl")];
        items.sort();
        let names: Vec<&str> = items.iter().map(Item::as_str).collect();
        assert_eq!(names, ["curl", "musl", "zlib"]);
    }

    #[test]
    fn run_id_display_parse() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn run_id_parse_invalid() {
        assert!("not-a-uuid".parse::<RunId>().is_err());
    }
}
