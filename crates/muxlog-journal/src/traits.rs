use std::sync::Arc;

use muxlog_store::Store;
use muxlog_types::{keys, ClassInfo, Context, Record};

use crate::entry::{EntryFilter, EntryKind, JournalEntry, ReplayReport};
use crate::error::JournalResult;
use crate::replay::replay_entries;

/// Append-only journal shared by any number of services.
pub trait Journal: Send + Sync {
    /// Record a write. The entry's service tag is the `service` binding of
    /// `ctx`; the journal assigns the sequence number.
    fn append(
        &self,
        ctx: &Context,
        kind: EntryKind,
        class: &ClassInfo,
        record: &Record,
    ) -> JournalResult<JournalEntry>;

    /// All entries in append order.
    fn entries(&self) -> JournalResult<Vec<JournalEntry>>;

    /// Re-apply entries to `target`, in append order.
    ///
    /// Each matching entry is dispatched as `target.put` or `target.remove`
    /// with a context derived from `ctx` that carries the replay marker and
    /// the entry's recorded class and service. `None` replays every entry.
    /// The first target error aborts the replay; entries already applied stay
    /// applied.
    fn replay(
        &self,
        ctx: &Context,
        target: &dyn Store,
        filter: Option<&EntryFilter>,
    ) -> JournalResult<ReplayReport> {
        let entries = self.entries()?;
        replay_entries(&entries, ctx, target, filter)
    }
}

/// Typed access to the journal bound in a [`Context`].
pub trait JournalContextExt {
    /// Derive a context carrying `journal` under [`keys::JOURNAL`].
    fn with_journal(&self, journal: Arc<dyn Journal>) -> Context;

    /// The journal bound under [`keys::JOURNAL`], if any.
    fn journal(&self) -> Option<Arc<dyn Journal>>;
}

impl JournalContextExt for Context {
    fn with_journal(&self, journal: Arc<dyn Journal>) -> Context {
        self.with(keys::JOURNAL, journal)
    }

    fn journal(&self) -> Option<Arc<dyn Journal>> {
        self.get::<Arc<dyn Journal>>(keys::JOURNAL).cloned()
    }
}
