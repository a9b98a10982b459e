//! Error types for keg operations.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.
//! Callers branch on [`KegError::kind`] instead of matching message text.

use std::path::PathBuf;

use thiserror::Error;

use crate::node_id::NodeId;

/// Result alias used across the crate.
pub type KegResult<T> = Result<T, KegError>;

/// Coarse error classification for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed id, expression, or config value.
    Invalid,
    /// Missing node, file, or index artifact.
    NotExist,
    /// Move/create target already occupied.
    DestinationExists,
    /// Unparseable metadata, frontmatter, tag expression, or index state.
    ParseFailure,
    /// Backend lacks an optional capability.
    Unsupported,
    /// Operation stopped by a cancellation signal.
    Cancelled,
    /// Low-level I/O failure.
    Io,
}

/// Error types for keg storage, indexing, and lifecycle operations.
#[derive(Error, Debug)]
pub enum KegError {
    /// Malformed input.
    #[error("invalid {what}: {reason}")]
    Invalid {
        /// What was being validated (`node id`, `keg target`, ...).
        what: String,
        /// Human readable reason.
        reason: String,
    },

    /// Node zero is the keg's permanent placeholder.
    #[error("node 0 cannot be removed")]
    ZeroNodeProtected,

    /// Node or file does not exist.
    #[error("{0} does not exist")]
    NotExist(String),

    /// Target id already holds a node.
    #[error("destination node {0} already exists")]
    DestinationExists(NodeId),

    /// Structured data failed to parse or validate.
    #[error("failed to parse {what}: {reason}")]
    ParseFailure {
        /// What was being parsed (`meta.yaml for node 3`, `tag expression`, ...).
        what: String,
        /// Parser message.
        reason: String,
    },

    /// Optional backend capability missing.
    #[error("backend does not support {0}")]
    Unsupported(&'static str),

    /// Cooperative cancellation fired.
    #[error("operation cancelled")]
    Cancelled,

    /// I/O failure on a concrete path.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Error wrapped with caller context.
    #[error("{context}: {source}")]
    Context {
        /// What the caller was doing.
        context: String,
        /// Wrapped error.
        #[source]
        source: Box<KegError>,
    },
}

impl KegError {
    /// Classify this error, looking through context wrappers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid { .. } | Self::ZeroNodeProtected => ErrorKind::Invalid,
            Self::NotExist(_) => ErrorKind::NotExist,
            Self::DestinationExists(_) => ErrorKind::DestinationExists,
            Self::ParseFailure { .. } => ErrorKind::ParseFailure,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io { .. } => ErrorKind::Io,
            Self::Context { source, .. } => source.kind(),
        }
    }

    /// Wrap with caller context while keeping the inner kind.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn invalid(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::ParseFailure {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map `NotFound` I/O errors to [`KegError::NotExist`], everything else to [`KegError::Io`].
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error, subject: &str) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotExist(subject.to_string())
        } else {
            Self::io(path, source)
        }
    }
}

/// Attach context to fallible keg calls.
pub trait ResultExt<T> {
    /// Wrap the error (if any) with lazily built context.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped in [`KegError::Context`].
    fn with_context<F, S>(self, f: F) -> KegResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for KegResult<T> {
    fn with_context<F, S>(self, f: F) -> KegResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|err| err.context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_kind() {
        let err = KegError::NotExist("node 7".to_string()).context("reading body");
        assert_eq!(err.kind(), ErrorKind::NotExist);
        assert_eq!(err.to_string(), "reading body: node 7 does not exist");
    }

    #[test]
    fn test_zero_node_message() {
        let err = KegError::ZeroNodeProtected;
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.to_string(), "node 0 cannot be removed");
    }
}
