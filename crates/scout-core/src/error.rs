//! Unified error type for apkscout.
//!
//! All crates funnel their failures into [`Error`]. The engine distinguishes
//! recoverable per-item failures ([`Error::Provider`]) from failures that
//! prevent a run from starting ([`Error::SourceEnumeration`]).

/// Unified error type covering all failure modes in apkscout.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A metadata lookup for a single item failed.
    #[error("Provider error [{item}]: {message}")]
    Provider {
        /// The item whose lookup failed.
        item: String,
        /// Human-readable error description.
        message: String,
    },

    /// The item list for a run could not be produced.
    #[error("Source enumeration error: {0}")]
    SourceEnumeration(String),

    /// An external tool (apk, doas, ...) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::Provider`].
    pub fn provider(item: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            item: item.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this error only affects a single item and can be absorbed by
    /// the run that produced it.
    pub fn is_item_local(&self) -> bool {
        matches!(self, Error::Provider { .. } | Error::Tool { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_display() {
        let err = Error::provider("zlib", "exit status 1");
        assert_eq!(err.to_string(), "Provider error [zlib]: exit status 1");
        assert!(err.is_item_local());
    }

    #[test]
    fn source_enumeration_display() {
        let err = Error::SourceEnumeration("apk search failed".into());
        assert_eq!(
            err.to_string(),
            "Source enumeration error: apk search failed"
        );
        assert!(!err.is_item_local());
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("apk", "timed out after 30s");
        assert_eq!(err.to_string(), "Tool error [apk]: timed out after 30s");
        assert!(err.is_item_local());
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("fetch.workers must be at least 1".into());
        assert_eq!(
            err.to_string(),
            "Validation error: fetch.workers must be at least 1"
        );
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "apk missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("apk missing"));
    }

    #[test]
    fn internal_display() {
        let err = Error::Internal("worker spawn failed".into());
        assert_eq!(err.to_string(), "Internal error: worker spawn failed");
    }
}
