use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("record of class `{class}` has no value for key field `{field}`")]
    MissingKey { class: String, field: String },

    #[error("class id must not be empty")]
    EmptyClassId,
}
