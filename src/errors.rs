// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for the signal layer and its collaborators
//!
//! Collaborator failures (`LedgerError`, `HardwareError`) are converted into a
//! cloneable [`FetchError`] before they reach a signal, because the same cause
//! is handed to every observer of that signal.

use thiserror::Error;

/// Errors surfaced by the ledger collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The RPC transport failed (connection lost, timeout, ...)
    #[error("Ledger transport error: {0}")]
    Transport(String),

    /// The requested record does not exist (yet) on this peer
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The ledger refused the write
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// Entry or tag payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

/// Errors surfaced by the hardware collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareError {
    /// The device went away between enumeration and the read
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// Port or file I/O failed
    #[error("Hardware I/O error: {0}")]
    Io(String),

    /// A sample line did not match the expected format
    #[error("Invalid measurement line: {0}")]
    InvalidLine(String),
}

impl From<std::io::Error> for HardwareError {
    fn from(err: std::io::Error) -> Self {
        HardwareError::Io(err.to_string())
    }
}

/// Cause carried by `AsyncResult::Error`
///
/// Always transient: the next watch cycle or poll tick retries the work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Ledger call failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Hardware probe failed
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// The task backing the signal panicked
    #[error("Task panicked: {0}")]
    Panicked(String),

    /// The signal was watched outside of a tokio runtime
    #[error("No async runtime available to run the task")]
    NoRuntime,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable held an unparsable value
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}
