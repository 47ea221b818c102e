//! Error types for the docsync engine.

use thiserror::Error;

/// All possible errors from the docsync engine.
///
/// Errors raised while a send is in flight never reach the caller: the sync
/// manager logs them and records the failure in the unsynced flag. The
/// variants below surface from construction, the store, and the transports.
#[derive(Debug, Error)]
pub enum Error {
    // Persistence errors
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store is corrupt: {0}")]
    CorruptStore(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // Transport errors
    #[error("transport error: {0}")]
    Transport(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected update with status {status}: {body}")]
    Status { status: u16, body: String },

    // Lifecycle errors
    #[error("sync manager is closed")]
    Closed,

    #[error("no tokio runtime available to drive the sync manager")]
    NoRuntime,

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("invalid configuration value for {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },
}

impl Error {
    /// Create a transport error from any message.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport(message.into())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
