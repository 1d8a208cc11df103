use muxlog_journal::JournalError;
use muxlog_store::StoreError;
use muxlog_types::{keys, TypeError};

/// Errors raised while building or starting a routing store.
///
/// Store operations (`put`, `remove`, ...) never produce this type: they
/// return the delegate's [`StoreError`] unchanged.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// Required construction input is missing or contradictory.
    #[error("configuration error: {0}")]
    Config(String),

    /// The configured service name is unusable.
    #[error("invalid service name: {0}")]
    InvalidService(#[from] TypeError),

    /// The default delegate could not be built.
    #[error("cannot build delegate store: {0}")]
    Delegate(#[source] StoreError),

    /// No journal was resolvable from the construction context.
    #[error("no journal bound in context under `{}`", keys::JOURNAL)]
    JournalUnavailable,

    /// Replay failed; the store was not started.
    #[error("journal replay failed: {0}")]
    Replay(#[source] JournalError),

    /// Configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result alias for routing construction and lifecycle operations.
pub type RoutingResult<T> = Result<T, RoutingError>;
