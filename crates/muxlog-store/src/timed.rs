use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use muxlog_types::{ClassInfo, Context, Record, RecordKey};

use crate::error::StoreResult;
use crate::traits::Store;

/// Accumulated timings for one named operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OpStats {
    /// Calls observed, including failed ones.
    pub count: u64,
    /// Calls that returned an error.
    pub failures: u64,
    pub total: Duration,
    pub max: Duration,
}

impl OpStats {
    fn observe(&mut self, elapsed: Duration, failed: bool) {
        self.count += 1;
        if failed {
            self.failures += 1;
        }
        self.total += elapsed;
        self.max = self.max.max(elapsed);
    }

    /// Mean duration per call, or zero if nothing was observed.
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total.as_nanos() / u128::from(self.count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

struct OpNames {
    put: String,
    find: String,
    select: String,
    remove: String,
    remove_all: String,
}

impl OpNames {
    fn for_class(class: &ClassInfo) -> Self {
        Self {
            put: format!("{}:put", class.id),
            find: format!("{}:find", class.id),
            select: format!("{}:select", class.id),
            remove: format!("{}:remove", class.id),
            remove_all: format!("{}:remove_all", class.id),
        }
    }
}

/// Store decorator that measures every operation.
///
/// Each call is timed under the name `"<class>:<op>"`, logged as a `tracing`
/// debug event, and folded into per-operation [`OpStats`]. Timing happens
/// whether or not the delegate succeeds; results pass through unchanged.
pub struct TimedStore<S> {
    delegate: S,
    names: OpNames,
    stats: Mutex<BTreeMap<String, OpStats>>,
}

impl<S: Store> TimedStore<S> {
    pub fn new(delegate: S) -> Self {
        let names = OpNames::for_class(delegate.of());
        Self {
            delegate,
            names,
            stats: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn delegate(&self) -> &S {
        &self.delegate
    }

    /// Snapshot of the stats gathered so far, keyed by operation name.
    pub fn stats(&self) -> BTreeMap<String, OpStats> {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    fn timed<T>(&self, name: &str, op: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let started = Instant::now();
        let result = op();
        let elapsed = started.elapsed();

        debug!(
            op = name,
            elapsed_us = elapsed.as_micros() as u64,
            ok = result.is_ok(),
            "store op"
        );
        // A poisoned stats map only loses measurements, never the result.
        if let Ok(mut stats) = self.stats.lock() {
            stats
                .entry(name.to_string())
                .or_default()
                .observe(elapsed, result.is_err());
        }
        result
    }
}

impl<S: Store> Store for TimedStore<S> {
    fn of(&self) -> &ClassInfo {
        self.delegate.of()
    }

    fn put(&self, ctx: &Context, record: Record) -> StoreResult<Record> {
        self.timed(&self.names.put, || self.delegate.put(ctx, record))
    }

    fn remove(&self, ctx: &Context, record: &Record) -> StoreResult<Option<Record>> {
        self.timed(&self.names.remove, || self.delegate.remove(ctx, record))
    }

    fn find(&self, ctx: &Context, key: &RecordKey) -> StoreResult<Option<Record>> {
        self.timed(&self.names.find, || self.delegate.find(ctx, key))
    }

    fn select(&self, ctx: &Context) -> StoreResult<Vec<Record>> {
        self.timed(&self.names.select, || self.delegate.select(ctx))
    }

    fn remove_all(&self, ctx: &Context) -> StoreResult<u64> {
        self.timed(&self.names.remove_all, || self.delegate.remove_all(ctx))
    }
}

impl<S: Store> std::fmt::Debug for TimedStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedStore")
            .field("class", &self.of().id)
            .field("ops", &self.stats().len())
            .finish()
    }
}
