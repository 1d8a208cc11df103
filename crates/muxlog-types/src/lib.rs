//! Foundation types for muxlog.
//!
//! This crate provides the request context and the data model shared by the
//! store, journal, and routing crates. Every other muxlog crate depends on
//! `muxlog-types`.
//!
//! # Key Types
//!
//! - [`Context`] -- Immutable, layered key/value environment threaded through every store call
//! - [`ServiceName`] -- Validated identity of the logical service that owns a write
//! - [`Record`] -- Object payload: an ordered map of field names to JSON values
//! - [`RecordKey`] -- Canonical primary-key value of a record
//! - [`ClassInfo`] -- Schema descriptor naming a record class and its primary-key field

pub mod context;
pub mod error;
pub mod record;
pub mod service;

pub use context::{keys, Context};
pub use error::TypeError;
pub use record::{ClassInfo, Record, RecordKey};
pub use service::ServiceName;
