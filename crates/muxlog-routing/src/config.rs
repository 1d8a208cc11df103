use serde::{Deserialize, Serialize};

use muxlog_types::{ClassInfo, Context};

use crate::builder::RoutingStoreBuilder;
use crate::error::RoutingResult;
use crate::routing::RoutingStore;

/// Declarative description of a routing store backed by the default
/// in-memory delegate.
///
/// ```toml
/// service = "billing"
/// timed = true
///
/// [class]
/// id = "billing.Invoice"
/// primary_key = "id"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub service: String,
    pub class: ClassInfo,
    /// Measure delegate calls.
    #[serde(default)]
    pub timed: bool,
}

impl RoutingConfig {
    pub fn new(service: impl Into<String>, class: ClassInfo) -> Self {
        Self {
            service: service.into(),
            class,
            timed: false,
        }
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> RoutingResult<Self> {
        Ok(toml::from_str(text)?)
    }
}

impl RoutingStore {
    /// Build a routing store described by `config`.
    pub fn from_config(ctx: &Context, config: &RoutingConfig) -> RoutingResult<Self> {
        RoutingStoreBuilder::new()
            .context(ctx.clone())
            .service(config.service.clone())
            .class(config.class.clone())
            .timed(config.timed)
            .build()
    }
}
