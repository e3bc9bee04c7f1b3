//! Shared error types for the twinmem system.

use thiserror::Error;

/// Top-level error type for the twinmem system.
///
/// Nothing here is fatal to the process: a failed turn ends that turn's
/// interaction and the session continues.
#[derive(Error, Debug)]
pub enum TwinError {
    /// A memory backend was unreachable or timed out during a search.
    /// Callers degrade to "not found" but must disclose the failure.
    #[error("Search failed on '{adapter}': {reason}")]
    SearchFailure {
        /// The adapter that failed.
        adapter: String,
        /// Why it failed.
        reason: String,
    },

    /// A write was attempted without satisfying its precondition.
    /// Rejected locally, before any backend call.
    #[error("Write precondition not met: {0}")]
    WritePrecondition(String),

    /// A backend call errored during an authorized write.
    #[error("Write failed on '{operation}': {reason}")]
    WriteBackend {
        /// The operation that failed.
        operation: String,
        /// Why it failed.
        reason: String,
    },

    /// Answer-recording referenced a question id that does not exist.
    #[error("Question not found: {0}")]
    LedgerNotFound(i64),

    /// A question ledger storage error occurred.
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// A tool gateway transport or protocol error occurred.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// The named adapter is not registered with the gateway.
    #[error("Unknown adapter: {0}")]
    UnknownAdapter(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Alias for Result with TwinError.
pub type TwinResult<T> = Result<T, TwinError>;
