//! Common error types for brickbin

use thiserror::Error;

/// Common result type for brickbin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the inventory pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// No input adapter signature matched the supplied input
    #[error("Unrecognized input format: {0}")]
    FormatUnrecognized(String),

    /// A remote catalog lookup failed (set resolution, taxonomy or image fetch)
    #[error("Remote lookup failed: {0}")]
    RemoteLookup(String),

    /// Invalid user-supplied parameter (cluster count out of range, missing working set)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Duplicate cache key insert. Signals a caller bug, never recoverable.
    #[error("Cache integrity violation: {0}")]
    CacheIntegrity(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
