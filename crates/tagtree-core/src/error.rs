//! Error types for registry construction and loading.

use thiserror::Error;

/// Errors that abort registry construction.
///
/// Malformed references and bad queries never produce these; they degrade to
/// a [`Diagnostic`](crate::Diagnostic) instead.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Reading a local index file failed.
    #[error("failed to read registry index: {0}")]
    Io(#[from] std::io::Error),

    /// The index is not a JSON object of resource records.
    #[error("failed to parse registry index: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTTP client could not be initialised.
    #[error("failed to initialise HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The HTTP request could not be completed.
    #[error("failed to fetch registry from {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("failed to fetch registry from {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The tag graph loops back on itself.
    #[error("tag cycle detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<String> },
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
