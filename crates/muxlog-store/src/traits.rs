use std::sync::Arc;

use muxlog_types::{ClassInfo, Context, Record, RecordKey};

use crate::error::StoreResult;

/// Keyed record store (DAO).
///
/// All implementations must satisfy these invariants:
/// - Records are keyed by the primary-key field named in [`Store::of`].
/// - `put` replaces any record with the same key (last write wins).
/// - `remove` of an absent key is not an error.
/// - The context is only read, never modified; decorators that need extra
///   bindings derive a new context with [`Context::with`].
/// - Errors are propagated to the caller unchanged.
pub trait Store: Send + Sync {
    /// Class descriptor of the records held by this store.
    fn of(&self) -> &ClassInfo;

    /// Insert or replace a record and return the stored value.
    fn put(&self, ctx: &Context, record: Record) -> StoreResult<Record>;

    /// Remove the record with the same key as `record`.
    ///
    /// Returns the removed record, or `None` if nothing was stored under
    /// that key.
    fn remove(&self, ctx: &Context, record: &Record) -> StoreResult<Option<Record>>;

    /// Look up a record by key.
    fn find(&self, ctx: &Context, key: &RecordKey) -> StoreResult<Option<Record>>;

    /// All records, in key order.
    fn select(&self, ctx: &Context) -> StoreResult<Vec<Record>>;

    /// Remove every record and return how many were removed.
    ///
    /// Default implementation calls `remove()` for each selected record so
    /// that decorators observe every removal. Backends may override.
    fn remove_all(&self, ctx: &Context) -> StoreResult<u64> {
        let mut removed = 0;
        for record in self.select(ctx)? {
            if self.remove(ctx, &record)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Look up the stored record with the same key as `record`.
    fn find_record(&self, ctx: &Context, record: &Record) -> StoreResult<Option<Record>> {
        let key = self.of().key_of(record)?;
        self.find(ctx, &key)
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn of(&self) -> &ClassInfo {
        (**self).of()
    }

    fn put(&self, ctx: &Context, record: Record) -> StoreResult<Record> {
        (**self).put(ctx, record)
    }

    fn remove(&self, ctx: &Context, record: &Record) -> StoreResult<Option<Record>> {
        (**self).remove(ctx, record)
    }

    fn find(&self, ctx: &Context, key: &RecordKey) -> StoreResult<Option<Record>> {
        (**self).find(ctx, key)
    }

    fn select(&self, ctx: &Context) -> StoreResult<Vec<Record>> {
        (**self).select(ctx)
    }

    fn remove_all(&self, ctx: &Context) -> StoreResult<u64> {
        (**self).remove_all(ctx)
    }
}
