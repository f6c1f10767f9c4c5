//! Error types for the Warden process runtime.
//!
//! This module defines the error hierarchy used throughout the runtime.
//! Each subsystem has its own error enum, and the root `Error` type can
//! wrap any of them, allowing for uniform error handling at the top level.
//!
//! None of these errors are fatal: a failed grant operation leaves the
//! grant table exactly as it was, and any harder response (backpressure,
//! process teardown) is a decision made by callers.

use crate::id::Handle;
use thiserror::Error;

/// Root error type for the Warden runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// Grant table errors
    #[error("Grant error: {0}")]
    Grant(#[from] GrantError),

    /// Privileged-view synchronization errors
    #[error("Privilege sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Errors returned by grant table operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrantError {
    /// The supplied access rights or region are malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The handle does not name an active grant
    #[error("Invalid grant handle {0}")]
    InvalidHandle(Handle),

    /// No free slot exists and the table could not grow
    #[error("Grant table exhausted")]
    Exhausted,
}

/// Errors reported by the privileged-view synchronization call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The privileged component refused the announced table storage
    #[error("Table location rejected: {0}")]
    Rejected(String),
}

/// Result type used throughout the Warden runtime.
pub type Result<T> = std::result::Result<T, Error>;
