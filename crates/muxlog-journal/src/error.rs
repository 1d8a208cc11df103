use std::io;

use muxlog_store::StoreError;

/// Errors produced by journal operations.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// I/O error during segment file operations.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Entry could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The replay target rejected an entry. Replay stops at this entry.
    #[error("replay of entry {seq} failed: {source}")]
    Store {
        seq: u64,
        #[source]
        source: StoreError,
    },

    /// A lock guarding journal state was poisoned.
    #[error("journal lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout the journal crate.
pub type JournalResult<T> = std::result::Result<T, JournalError>;
