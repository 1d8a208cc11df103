use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::service::ServiceName;

/// Well-known context keys.
pub mod keys {
    /// Name of the service on whose behalf a write is made.
    pub const SERVICE: &str = "service";
    /// Shared journal handle, bound by the host at wiring time.
    pub const JOURNAL: &str = "journal";
    /// Present while a journal entry is being re-applied.
    pub const REPLAY: &str = "journal.replay";
    /// Service tag recorded in the entry currently being replayed.
    pub const RECORDED_SERVICE: &str = "journal.recordedService";
    /// Class id recorded in the entry currently being replayed.
    pub const RECORDED_CLASS: &str = "journal.recordedClass";
}

struct Binding {
    key: String,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Binding>>,
}

/// Immutable, layered key/value environment passed through every store call.
///
/// A context is a persistent linked chain of bindings. [`Context::with`]
/// pushes one binding in front of the chain and returns a new context in
/// O(1); the receiver is never modified, so every holder of a context keeps
/// seeing exactly the bindings it was given. Lookups walk from the newest
/// binding to the oldest, so a later binding for a key shadows earlier ones.
///
/// Cloning a context is a reference-count increment.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Binding>>,
    depth: usize,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context with one additional binding.
    pub fn with<V>(&self, key: impl Into<String>, value: V) -> Self
    where
        V: Any + Send + Sync,
    {
        Self {
            head: Some(Arc::new(Binding {
                key: key.into(),
                value: Arc::new(value),
                parent: self.head.clone(),
            })),
            depth: self.depth + 1,
        }
    }

    /// Look up the newest binding for `key` and downcast it to `V`.
    ///
    /// Returns `None` if the key is unbound, or if the newest binding holds a
    /// value of a different type. Older bindings are never consulted once a
    /// newer one for the same key is found.
    pub fn get<V: Any>(&self, key: &str) -> Option<&V> {
        self.binding(key)?.value.downcast_ref::<V>()
    }

    /// Look up a string-valued binding.
    ///
    /// Accepts bindings holding a `String`, a `&'static str`, or a
    /// [`ServiceName`].
    pub fn get_str(&self, key: &str) -> Option<&str> {
        let value = &self.binding(key)?.value;
        if let Some(s) = value.downcast_ref::<String>() {
            return Some(s.as_str());
        }
        if let Some(s) = value.downcast_ref::<&'static str>() {
            return Some(*s);
        }
        value.downcast_ref::<ServiceName>().map(ServiceName::as_str)
    }

    /// Returns `true` if `key` has a binding of any type.
    pub fn contains(&self, key: &str) -> bool {
        self.binding(key).is_some()
    }

    /// Derive a context carrying `service` under [`keys::SERVICE`].
    pub fn with_service(&self, service: ServiceName) -> Self {
        self.with(keys::SERVICE, service)
    }

    /// The service name bound under [`keys::SERVICE`], if any.
    pub fn service(&self) -> Option<&str> {
        self.get_str(keys::SERVICE)
    }

    /// Number of bindings in the chain, counting shadowed ones.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `true` if the context has no bindings.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Distinct bound keys, newest first.
    pub fn keys(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut cursor = self.head.as_deref();
        while let Some(binding) = cursor {
            if seen.insert(binding.key.as_str()) {
                out.push(binding.key.as_str());
            }
            cursor = binding.parent.as_deref();
        }
        out
    }

    /// Returns `true` if both contexts share the same chain head.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    fn binding(&self, key: &str) -> Option<&Binding> {
        let mut cursor = self.head.as_deref();
        while let Some(binding) = cursor {
            if binding.key == key {
                return Some(binding);
            }
            cursor = binding.parent.as_deref();
        }
        None
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("keys", &self.keys())
            .field("depth", &self.depth)
            .finish()
    }
}
