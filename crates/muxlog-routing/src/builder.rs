use std::sync::Arc;

use muxlog_store::Store;
use muxlog_types::{ClassInfo, Context};

use crate::error::{RoutingError, RoutingResult};
use crate::routing::{DelegateSource, RoutingStore};

/// Step-by-step construction of a [`RoutingStore`].
///
/// Exactly one of [`delegate`](Self::delegate) or [`class`](Self::class)
/// must be given. Validation is the same as for
/// [`RoutingStore::with_delegate`] and [`RoutingStore::with_class`].
#[derive(Default)]
pub struct RoutingStoreBuilder {
    context: Context,
    service: Option<String>,
    delegate: Option<Arc<dyn Store>>,
    class: Option<ClassInfo>,
    timed: bool,
}

impl RoutingStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context to resolve the journal from and to replay with.
    pub fn context(mut self, ctx: Context) -> Self {
        self.context = ctx;
        self
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn delegate(mut self, delegate: Arc<dyn Store>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn class(mut self, class: ClassInfo) -> Self {
        self.class = Some(class);
        self
    }

    /// Measure delegate calls with a [`TimedStore`](muxlog_store::TimedStore).
    pub fn timed(mut self, timed: bool) -> Self {
        self.timed = timed;
        self
    }

    pub fn build(self) -> RoutingResult<RoutingStore> {
        let source = match (self.delegate, self.class) {
            (Some(_), Some(_)) => {
                return Err(RoutingError::Config(
                    "give either a delegate store or a class, not both".into(),
                ))
            }
            (Some(store), None) => Some(DelegateSource::Store(store)),
            (None, Some(class)) => Some(DelegateSource::Class(class)),
            (None, None) => None,
        };
        RoutingStore::assemble(&self.context, self.service, source, self.timed)
    }
}
