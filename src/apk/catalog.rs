//! Package enumeration via `apk search`.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use scout_core::{Item, Result};
use scout_fetch::ItemCatalog;
use tracing::debug;

use super::ApkTool;

/// Lists every package the local apk database knows about.
#[derive(Debug, Clone)]
pub struct ApkCatalog {
    tool: ApkTool,
}

impl ApkCatalog {
    pub fn new(tool: ApkTool) -> Self {
        Self { tool }
    }
}

impl ItemCatalog for ApkCatalog {
    fn name(&self) -> &'static str {
        "apk search"
    }

    fn list_items(&self) -> Result<Vec<Item>> {
        let output = self.tool.command(["search"]).execute()?;
        let items = parse_package_names(&output.stdout);
        debug!(packages = items.len(), "Parsed apk search output");
        Ok(items)
    }
}

fn version_suffix() -> &'static Regex {
    static VERSION_SUFFIX: OnceLock<Regex> = OnceLock::new();
    VERSION_SUFFIX.get_or_init(|| {
        // First "-<digit>" and everything after it: "curl-dev-8.5.0-r0" -> "curl-dev".
        Regex::new(r"-[0-9].*").unwrap_or_else(|e| unreachable!("invalid literal regex: {e}"))
    })
}

/// Turn `apk search` output into package names.
///
/// Each line has its version suffix stripped. Blank lines and repeated
/// names (several versions of one package) are dropped; the first
/// occurrence keeps its position.
pub fn parse_package_names(output: &str) -> Vec<Item> {
    let re = version_suffix();
    let mut seen = HashSet::new();

    output
        .lines()
        .map(|line| re.replace(line.trim(), "").into_owned())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .map(Item::from)
        .collect()
}
