//! Error taxonomy for world generation and the worker pool.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to callers of the chunk store and worker pool.
///
/// Cloneable so that deduplicated in-flight generations can hand the
/// same failure to every waiting caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    /// A message failed schema validation at a send or receive boundary.
    #[error("schema validation failed: {0}")]
    Schema(String),

    /// A worker reported an explicit error for this request.
    #[error("worker error: {0}")]
    Worker(String),

    /// No response arrived within the configured timeout.
    #[error("request {id} timed out after {timeout:?}")]
    Timeout { id: String, timeout: Duration },

    /// The pool was shut down while the request was still pending.
    #[error("worker pool is shut down")]
    PoolClosed,
}

/// Errors from savegame persistence.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("not a world save file")]
    BadMagic,

    #[error("unsupported save version {0}")]
    BadVersion(u32),
}
