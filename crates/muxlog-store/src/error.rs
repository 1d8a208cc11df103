use std::error::Error;
use std::fmt;
use std::sync::Arc;

use muxlog_types::TypeError;

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The record has no usable primary-key value.
    #[error("record of class `{class}` has no value for key field `{field}`")]
    MissingKey { class: String, field: String },

    /// The record is otherwise unacceptable to the backend.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The class descriptor is unusable.
    #[error("invalid class: {0}")]
    InvalidClass(String),

    /// Storage backend is read-only or otherwise refusing writes.
    #[error("store is read-only")]
    ReadOnly,

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// Failure reported by a downstream backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// The durability journal refused a write. The write was not applied.
    #[error("journal append failed: {0}")]
    Journal(#[source] ErrorSource),
}

/// Cloneable handle to an error raised below the store layer.
///
/// Displays as the wrapped error and forwards its source chain. Two handles
/// compare equal only if they share the same underlying error.
#[derive(Clone)]
pub struct ErrorSource(Arc<dyn Error + Send + Sync>);

impl ErrorSource {
    pub fn new(err: impl Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }

    /// The wrapped error, for downcasting.
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl fmt::Debug for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for ErrorSource {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

impl PartialEq for ErrorSource {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl Eq for ErrorSource {}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::MissingKey { class, field } => Self::MissingKey { class, field },
            TypeError::EmptyClassId => Self::InvalidClass("class id must not be empty".into()),
            other => Self::InvalidRecord(other.to_string()),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn journal_error_keeps_source_chain() {
        let io = io::Error::new(io::ErrorKind::Other, "disk full");
        let err = StoreError::Journal(ErrorSource::new(io));

        assert_eq!(err.to_string(), "journal append failed: disk full");
        let source = err.source().expect("journal variant has a source");
        assert_eq!(source.to_string(), "disk full");
        match &err {
            StoreError::Journal(src) => assert!(src.inner().downcast_ref::<io::Error>().is_some()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_sources_compare_by_identity() {
        let a = ErrorSource::new(io::Error::new(io::ErrorKind::Other, "x"));
        let b = ErrorSource::new(io::Error::new(io::ErrorKind::Other, "x"));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
