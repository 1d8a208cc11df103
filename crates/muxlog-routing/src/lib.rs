//! Service-routing store decorator for muxlog.
//!
//! A [`RoutingStore`] wraps a delegate store and stamps the context of every
//! write with its configured service name. The journal beneath the delegate
//! records that name alongside each entry, which lets many services share one
//! journal. On [`Startable::start`] the store replays the shared journal
//! through itself to rebuild in-memory state.

pub mod builder;
pub mod config;
pub mod error;
pub mod routing;
pub mod service;

pub use builder::RoutingStoreBuilder;
pub use config::RoutingConfig;
pub use error::{RoutingError, RoutingResult};
pub use routing::RoutingStore;
pub use service::{Lifecycle, Startable};
