//! Error types shared across the pool variants.

use thiserror::Error;

pub use crate::monitor::{MonitorError, Timeout as LockTimeout};

/// Errors surfaced by pool construction and submission.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A worker thread failed to spawn. No threads from a partially
    /// constructed pool are left running when this is returned.
    #[error("failed to start worker thread: {0}")]
    ThreadStart(#[source] std::io::Error),

    /// The pool configuration failed validation (e.g. a zero-byte
    /// worker stack size).
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),
}
