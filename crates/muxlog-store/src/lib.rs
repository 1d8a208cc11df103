//! Keyed record storage for muxlog.
//!
//! A store (DAO) holds records of a single [`ClassInfo`], keyed by the
//! primary-key field of each record. Every operation receives the caller's
//! [`Context`](muxlog_types::Context) so that decorators and backends can read
//! cross-cutting bindings such as the current service name.
//!
//! # Backends and decorators
//!
//! All stores implement the [`Store`] trait:
//!
//! - [`InMemoryStore`] -- `BTreeMap`-based store, the default delegate
//! - [`TimedStore`] -- decorator that measures each operation and logs it
//!
//! # Design Rules
//!
//! 1. `put` is last-write-wins per key.
//! 2. Removing an absent key succeeds and returns `None`.
//! 3. Stores never modify the context they are handed.
//! 4. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod timed;
pub mod traits;

pub use error::{ErrorSource, StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use muxlog_types::ClassInfo;
pub use timed::{OpStats, TimedStore};
pub use traits::Store;
