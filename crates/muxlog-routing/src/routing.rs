use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use muxlog_journal::{Journal, JournalContextExt, JournaledStore, ReplayReport};
use muxlog_store::{InMemoryStore, Store, StoreResult, TimedStore};
use muxlog_types::{ClassInfo, Context, Record, RecordKey, ServiceName};

use crate::error::{RoutingError, RoutingResult};
use crate::service::{Lifecycle, Startable};

/// Where a routing store's delegate comes from.
pub(crate) enum DelegateSource {
    /// Caller-supplied delegate.
    Store(Arc<dyn Store>),
    /// Build the default in-memory delegate for this class.
    Class(ClassInfo),
}

/// Store decorator that stamps every write with a service name.
///
/// `put`, `remove` and `remove_all` forward to the delegate with
/// `ctx.with("service", name)`; reads are forwarded untouched. The caller's
/// context is never modified and delegate results, including errors, are
/// returned as-is.
///
/// [`Startable::start`] replays the shared journal through this store, so
/// replayed writes are stamped exactly like live ones.
pub struct RoutingStore {
    service: ServiceName,
    delegate: Arc<dyn Store>,
    context: Context,
    journal: Option<Arc<dyn Journal>>,
    started: AtomicBool,
    last_replay: Mutex<Option<ReplayReport>>,
}

impl RoutingStore {
    /// Wrap an existing delegate.
    pub fn with_delegate(
        ctx: &Context,
        delegate: Arc<dyn Store>,
        service: impl Into<String>,
    ) -> RoutingResult<Self> {
        Self::assemble(
            ctx,
            Some(service.into()),
            Some(DelegateSource::Store(delegate)),
            false,
        )
    }

    /// Build the default delegate for `class`.
    ///
    /// The delegate is an [`InMemoryStore`], wrapped in a [`JournaledStore`]
    /// when `ctx` has a journal bound so that writes are recorded.
    pub fn with_class(
        ctx: &Context,
        class: ClassInfo,
        service: impl Into<String>,
    ) -> RoutingResult<Self> {
        Self::assemble(
            ctx,
            Some(service.into()),
            Some(DelegateSource::Class(class)),
            false,
        )
    }

    /// Single validation path shared by every constructor.
    pub(crate) fn assemble(
        ctx: &Context,
        service: Option<String>,
        source: Option<DelegateSource>,
        timed: bool,
    ) -> RoutingResult<Self> {
        let service = service
            .ok_or_else(|| RoutingError::Config("service name is required".into()))?;
        let service = ServiceName::new(service)?;
        let source = source.ok_or_else(|| {
            RoutingError::Config(format!("service `{service}` has no delegate store or class"))
        })?;

        let journal = ctx.journal();
        let delegate = match source {
            DelegateSource::Store(store) => store,
            DelegateSource::Class(class) => default_delegate(&service, class, journal.clone())?,
        };
        let delegate: Arc<dyn Store> = if timed {
            Arc::new(TimedStore::new(delegate))
        } else {
            delegate
        };

        info!(
            service = %service,
            class = %delegate.of().id,
            journal = journal.is_some(),
            "routing store constructed"
        );

        Ok(Self {
            service,
            delegate,
            context: ctx.clone(),
            journal,
            started: AtomicBool::new(false),
            last_replay: Mutex::new(None),
        })
    }

    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    pub fn delegate(&self) -> &Arc<dyn Store> {
        &self.delegate
    }

    /// Context captured at construction; used for replay.
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.started.load(Ordering::Acquire) {
            Lifecycle::Started
        } else {
            Lifecycle::Constructed
        }
    }

    /// Report of the most recent successful replay.
    pub fn last_replay(&self) -> Option<ReplayReport> {
        self.last_replay.lock().ok().and_then(|r| *r)
    }

    fn stamp(&self, ctx: &Context) -> Context {
        ctx.with_service(self.service.clone())
    }
}

fn default_delegate(
    service: &ServiceName,
    class: ClassInfo,
    journal: Option<Arc<dyn Journal>>,
) -> RoutingResult<Arc<dyn Store>> {
    let store = InMemoryStore::try_new(class).map_err(RoutingError::Delegate)?;
    Ok(match journal {
        Some(journal) => Arc::new(JournaledStore::new(store, journal)),
        None => {
            warn!(service = %service, "no journal in context; writes will not be journaled");
            Arc::new(store)
        }
    })
}

impl Store for RoutingStore {
    fn of(&self) -> &ClassInfo {
        self.delegate.of()
    }

    fn put(&self, ctx: &Context, record: Record) -> StoreResult<Record> {
        self.delegate.put(&self.stamp(ctx), record)
    }

    fn remove(&self, ctx: &Context, record: &Record) -> StoreResult<Option<Record>> {
        self.delegate.remove(&self.stamp(ctx), record)
    }

    fn find(&self, ctx: &Context, key: &RecordKey) -> StoreResult<Option<Record>> {
        self.delegate.find(ctx, key)
    }

    fn select(&self, ctx: &Context) -> StoreResult<Vec<Record>> {
        self.delegate.select(ctx)
    }

    fn remove_all(&self, ctx: &Context) -> StoreResult<u64> {
        self.delegate.remove_all(&self.stamp(ctx))
    }
}

impl Startable for RoutingStore {
    type Error = RoutingError;

    /// Replay every journal entry through this store.
    ///
    /// Not guarded against repeated calls: each call replays again.
    fn start(&self) -> RoutingResult<()> {
        let Some(journal) = self.journal.as_ref() else {
            error!(service = %self.service, "cannot start: no journal in context");
            return Err(RoutingError::JournalUnavailable);
        };

        info!(service = %self.service, "replaying journal");
        let report = journal.replay(&self.context, self, None).map_err(|e| {
            error!(service = %self.service, error = %e, "journal replay failed");
            RoutingError::Replay(e)
        })?;

        if let Ok(mut last) = self.last_replay.lock() {
            *last = Some(report);
        }
        self.started.store(true, Ordering::Release);

        info!(
            service = %self.service,
            evaluated = report.evaluated,
            dispatched = report.dispatched,
            "routing store started"
        );
        Ok(())
    }
}

impl std::fmt::Debug for RoutingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingStore")
            .field("service", &self.service)
            .field("class", &self.of().id)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}
