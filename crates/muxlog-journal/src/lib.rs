//! Shared durability journal for muxlog.
//!
//! A single journal carries writes for many services. Each entry records the
//! service name found in the writer's context, so one log can be replayed
//! into the right stores after a restart.
//!
//! - [`Journal`] -- append/replay trait boundary
//! - [`InMemoryJournal`] -- `Vec`-backed journal for tests and embedding
//! - [`FileJournal`] -- crash-recoverable journal on a CRC-framed segment file
//! - [`JournaledStore`] -- store adapter that records live writes and applies
//!   replayed ones

pub mod entry;
pub mod error;
pub mod file;
pub mod journaled;
pub mod memory;
pub mod replay;
pub mod traits;
pub mod wal;

pub use entry::{EntryFilter, EntryKind, JournalEntry, ReplayReport};
pub use error::{JournalError, JournalResult};
pub use file::FileJournal;
pub use journaled::JournaledStore;
pub use memory::InMemoryJournal;
pub use traits::{Journal, JournalContextExt};
pub use wal::{SyncMode, WalConfig, WriteAheadLog};
