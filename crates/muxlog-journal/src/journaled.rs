use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error};

use muxlog_store::{ErrorSource, Store, StoreError, StoreResult};
use muxlog_types::{keys, ClassInfo, Context, Record, RecordKey};

use crate::entry::EntryKind;
use crate::traits::Journal;

/// How a write reaching the store should be handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriteMode {
    /// Caller traffic: apply, then record in the journal.
    Live,
    /// Replayed entry for this store: apply only.
    Replay,
    /// Replayed entry recorded for another service or class: drop.
    Foreign,
}

/// Store adapter that records every live write in a shared journal.
///
/// Live writes are applied to the inner store first and journaled only if
/// the inner store accepted them; the entry's service tag is the `service`
/// binding of the caller's context. If the append fails the inner write is
/// rolled back and the caller gets [`StoreError::Journal`]. Writes arriving
/// under the [`keys::REPLAY`] marker are applied without journaling.
///
/// Writes are serialized through one lock held across apply and append, so
/// journal order always equals apply order. Reads do not take it and may
/// observe a live write before its append completes.
///
/// A replayed entry whose recorded service differs from the context's
/// `service` binding, or whose recorded class differs from this store's
/// class, is ignored: it is neither applied nor journaled, and is counted in
/// [`JournaledStore::ignored_replays`]. Untagged entries are applied.
pub struct JournaledStore<S> {
    inner: S,
    journal: Arc<dyn Journal>,
    writes: Mutex<()>,
    ignored: AtomicU64,
}

impl<S: Store> JournaledStore<S> {
    pub fn new(inner: S, journal: Arc<dyn Journal>) -> Self {
        Self {
            inner,
            journal,
            writes: Mutex::new(()),
            ignored: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn journal(&self) -> &Arc<dyn Journal> {
        &self.journal
    }

    /// Replayed entries dropped because they belong to another service or
    /// class.
    pub fn ignored_replays(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    fn mode(&self, ctx: &Context) -> WriteMode {
        if !ctx.contains(keys::REPLAY) {
            return WriteMode::Live;
        }
        if let Some(class) = ctx.get_str(keys::RECORDED_CLASS) {
            if class != self.inner.of().id {
                return WriteMode::Foreign;
            }
        }
        match (ctx.get_str(keys::RECORDED_SERVICE), ctx.service()) {
            (Some(recorded), Some(current)) if recorded != current => WriteMode::Foreign,
            _ => WriteMode::Replay,
        }
    }

    fn lock_writes(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.writes.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn ignore(&self, ctx: &Context, kind: EntryKind) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
        debug!(
            seq = ctx.get::<u64>(keys::REPLAY).copied(),
            %kind,
            recorded_service = ctx.get_str(keys::RECORDED_SERVICE),
            recorded_class = ctx.get_str(keys::RECORDED_CLASS),
            service = ctx.service(),
            "ignoring replayed entry for another store"
        );
    }

    fn record(&self, ctx: &Context, kind: EntryKind, record: &Record) -> StoreResult<()> {
        let entry = self
            .journal
            .append(ctx, kind, self.inner.of(), record)
            .map_err(|e| StoreError::Journal(ErrorSource::new(e)))?;
        debug!(seq = entry.seq, %kind, service = entry.service.as_deref(), "journaled write");
        Ok(())
    }

    /// Apply and journal a put. Caller holds the write lock.
    fn put_live(&self, ctx: &Context, record: Record) -> StoreResult<Record> {
        let key = self.inner.of().key_of(&record)?;
        let previous = self.inner.find(ctx, &key)?;
        let stored = self.inner.put(ctx, record)?;
        if let Err(err) = self.record(ctx, EntryKind::Put, &stored) {
            let undo = match previous {
                Some(previous) => self.inner.put(ctx, previous).map(|_| ()),
                None => self.inner.remove(ctx, &stored).map(|_| ()),
            };
            self.log_rollback(EntryKind::Put, &key, undo);
            return Err(err);
        }
        Ok(stored)
    }

    /// Apply and journal a remove. Caller holds the write lock.
    fn remove_live(&self, ctx: &Context, record: &Record) -> StoreResult<Option<Record>> {
        let removed = self.inner.remove(ctx, record)?;
        // Journaled even when absent: this store may not have been rebuilt
        // from the journal yet.
        if let Err(err) = self.record(ctx, EntryKind::Remove, removed.as_ref().unwrap_or(record)) {
            if let Some(removed) = removed {
                let key = self.inner.of().key_of(&removed)?;
                let undo = self.inner.put(ctx, removed).map(|_| ());
                self.log_rollback(EntryKind::Remove, &key, undo);
            }
            return Err(err);
        }
        Ok(removed)
    }

    fn log_rollback(&self, kind: EntryKind, key: &RecordKey, undo: StoreResult<()>) {
        match undo {
            Ok(()) => debug!(%kind, key = %key, "rolled back unjournaled write"),
            Err(e) => error!(%kind, key = %key, error = %e, "rollback of unjournaled write failed"),
        }
    }
}

impl<S: Store> Store for JournaledStore<S> {
    fn of(&self) -> &ClassInfo {
        self.inner.of()
    }

    fn put(&self, ctx: &Context, record: Record) -> StoreResult<Record> {
        match self.mode(ctx) {
            WriteMode::Live => {
                let _writes = self.lock_writes()?;
                self.put_live(ctx, record)
            }
            WriteMode::Replay => {
                let _writes = self.lock_writes()?;
                self.inner.put(ctx, record)
            }
            WriteMode::Foreign => {
                self.ignore(ctx, EntryKind::Put);
                Ok(record)
            }
        }
    }

    fn remove(&self, ctx: &Context, record: &Record) -> StoreResult<Option<Record>> {
        match self.mode(ctx) {
            WriteMode::Live => {
                let _writes = self.lock_writes()?;
                self.remove_live(ctx, record)
            }
            WriteMode::Replay => {
                let _writes = self.lock_writes()?;
                self.inner.remove(ctx, record)
            }
            WriteMode::Foreign => {
                self.ignore(ctx, EntryKind::Remove);
                Ok(None)
            }
        }
    }

    fn find(&self, ctx: &Context, key: &RecordKey) -> StoreResult<Option<Record>> {
        self.inner.find(ctx, key)
    }

    fn select(&self, ctx: &Context) -> StoreResult<Vec<Record>> {
        self.inner.select(ctx)
    }

    fn remove_all(&self, ctx: &Context) -> StoreResult<u64> {
        let _writes = self.lock_writes()?;
        if self.mode(ctx) != WriteMode::Live {
            return self.inner.remove_all(ctx);
        }
        let mut removed = 0;
        for record in self.inner.select(ctx)? {
            if self.remove_live(ctx, &record)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl<S: Store> std::fmt::Debug for JournaledStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournaledStore")
            .field("class", &self.of().id)
            .field("ignored_replays", &self.ignored_replays())
            .finish()
    }
}
