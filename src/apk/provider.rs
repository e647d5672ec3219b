//! Per-package lookups via `apk info --provides`.

use scout_core::{Error, Item, Result};
use scout_fetch::MetadataProvider;

use super::ApkTool;

/// Looks up what a package provides (commands, shared objects, pkg-config
/// names) with `apk info --provides <package>`.
#[derive(Debug, Clone)]
pub struct ApkProvider {
    tool: ApkTool,
}

impl ApkProvider {
    pub fn new(tool: ApkTool) -> Self {
        Self { tool }
    }
}

impl MetadataProvider for ApkProvider {
    fn name(&self) -> &'static str {
        "apk info --provides"
    }

    fn fetch_provides(&self, item: &Item) -> Result<Vec<String>> {
        let output = self
            .tool
            .command(["info", "--provides", item.as_str()])
            .execute()
            .map_err(|e| match e {
                Error::Tool { message, .. } => Error::provider(item.as_str(), message),
                other => other,
            })?;

        Ok(parse_provides(&output.stdout))
    }
}

/// Extract provide entries from `apk info --provides` output.
///
/// The `"<name>-<version> provides:"` header and blank lines are dropped;
/// every other line is kept verbatim, trimmed.
pub fn parse_provides(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.ends_with(" provides:"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_header_and_blanks() {
        let out = "curl-8.5.0-r0 provides:\ncmd:curl=8.5.0-r0\n\n";
        assert_eq!(parse_provides(out), ["cmd:curl=8.5.0-r0"]);
    }

    #[test]
    fn keeps_every_entry() {
        let out = "zlib-1.3.1-r0 provides:\nso:libz.so.1=1.3.1\npc:zlib=1.3.1\n";
        assert_eq!(parse_provides(out), ["so:libz.so.1=1.3.1", "pc:zlib=1.3.1"]);
    }

    #[test]
    fn header_only_is_empty() {
        assert!(parse_provides("curl-dev-8.5.0-r0 provides:\n\n").is_empty());
    }

    #[test]
    fn several_packages_in_one_output() {
        // apk prints one block per matching package.
        let out = "a-1.0-r0 provides:\ncmd:a=1.0\n\nb-2.0-r0 provides:\ncmd:b=2.0\n";
        assert_eq!(parse_provides(out), ["cmd:a=1.0", "cmd:b=2.0"]);
    }
}
