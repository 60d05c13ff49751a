use thiserror::Error;

/// Failure reported by a storage backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Backend cannot be reached at all (connection refused, file missing).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// The record targeted by an update/delete no longer exists.
    #[error("record {id} not found")]
    NotFound { id: i64 },
    /// Any other backend-level failure.
    #[error("storage error: {0}")]
    Backend(String),
}

/// Failure reading a LID mapping entry. Never fatal for a sweep.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("mapping read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("mapping for '{lid}' is malformed: {message}")]
    Parse { lid: String, message: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config validation error (empty path, bad sample size, ...).
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Errors that abort a sweep before any mutation happens.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("cannot read contact snapshot: {0}")]
    Snapshot(#[source] StoreError),
}
