//! Soft-fail diagnostics.
//!
//! Bad references and malformed queries do not abort anything. Each one is
//! logged at `warn` level and, during construction, kept on the registry so
//! callers can inspect what was dropped.

use std::fmt;

use tracing::warn;

/// A recoverable problem found while building or querying the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A record names a parent tag that is not in the index. The edge is dropped.
    MissingTag { key: String, tag: String },
    /// A lookup named a key that is not in the index.
    UnknownKey { key: String },
    /// A filter was requested with no tags; the full index is returned.
    EmptyFilter,
    /// A filter op other than `and`/`or`; the full index is returned.
    InvalidOp { op: String },
    /// Flattening stopped at a key already on the ancestor path.
    CycleTruncated { path: Vec<String> },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTag { key, tag } => {
                write!(f, "tag '{tag}' of '{key}' is missing from the index")
            }
            Self::UnknownKey { key } => write!(f, "key '{key}' is not in the index"),
            Self::EmptyFilter => write!(f, "filter requested with no tags"),
            Self::InvalidOp { op } => {
                write!(f, "filter op must be 'and' or 'or' (was '{op}')")
            }
            Self::CycleTruncated { path } => {
                write!(f, "tag cycle truncated: {}", path.join(" -> "))
            }
        }
    }
}

impl Diagnostic {
    /// Log the diagnostic without keeping it.
    pub(crate) fn emit(&self) {
        warn!(diagnostic = %self, "registry diagnostic");
    }

    /// Log the diagnostic and append it to `sink`.
    pub(crate) fn report(self, sink: &mut Vec<Diagnostic>) {
        self.emit();
        sink.push(self);
    }
}
