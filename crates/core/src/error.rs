//! Error types for the booking store
//!
//! Two layers of errors exist:
//! - `TransportError`: what a remote call reports (lookup, search, save)
//! - `StoreError`: what store operations surface to their callers
//!
//! Validation rejections at the search gate and superseded results are not
//! errors for consumers; they are filtered or logged inside the engine.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::flight::FlightId;
use std::io;
use thiserror::Error;

/// Result type alias for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure reported by a transport call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote source has no record with this identity
    #[error("flight {0} not found")]
    NotFound(FlightId),

    /// The remote source could not be reached or timed out
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The remote source refused the request
    #[error("remote rejected request: {0}")]
    Rejected(String),
}

/// Error types for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// A transport call failed
    #[error("transport failure during {operation}: {source}")]
    Transport {
        /// Operation that issued the call (`find`, `find_by_id`, `save`)
        operation: &'static str,
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },

    /// The result belonged to a request that a newer one replaced
    #[error("{0} result superseded by a newer request")]
    Superseded(&'static str),

    /// The store was shut down before the operation could complete
    #[error("store has been shut down")]
    Closed,

    /// No tokio runtime is available to drive background tasks
    #[error("no async runtime available: {0}")]
    NoRuntime(String),

    /// Configuration value out of range or unparseable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error (configuration file access)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Wrap a transport failure with the operation that caused it
    pub fn transport(operation: &'static str, source: TransportError) -> Self {
        StoreError::Transport { operation, source }
    }

    /// Whether this error is a failed remote call
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Transport { .. })
    }
}
