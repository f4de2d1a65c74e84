//! Domain Adapters
//!
//! One adapter per metric domain (machine, gpu, web). Each adapter is a thin
//! shim between the configuration feature gate and the prometheus registry:
//! it decides nothing itself beyond how to construct and register its
//! domain's collector.
//!
//! [`init_domains`] drives them all: it blocks on the configuration barrier,
//! consults the feature gate per adapter, and registers the enabled ones.
//! A construction failure in one domain (a missing accelerator driver, say)
//! is logged and swallowed so the remaining domains keep serving.

use async_trait::async_trait;
use prometheus::Registry;
use tracing::{debug, warn};

use crate::config::ConfigCell;
use crate::error::Result;

mod gpu;
mod machine;
mod web;

pub use gpu::{GpuAdapter, NvidiaCollector};
pub use machine::MachineAdapter;
pub use web::{http_metrics, WebAdapter};

/// A metric domain that can register itself with a prometheus registry.
#[async_trait]
pub trait DomainAdapter: Send + Sync {
    /// Stable short name, used in logs.
    fn name(&self) -> &'static str;

    /// Tag looked up in the configured metrics list (case-insensitive).
    fn gate_tag(&self) -> &'static str;

    /// Construct the domain's collector and register it.
    async fn register(&self, registry: &Registry) -> Result<()>;
}

/// The built-in adapters, one per domain.
pub fn default_adapters() -> Vec<Box<dyn DomainAdapter>> {
    vec![
        Box::new(MachineAdapter),
        Box::new(GpuAdapter::default()),
        Box::new(WebAdapter),
    ]
}

/// Initialize every enabled domain against `registry`.
///
/// Blocks until the configuration has been published. Disabled domains are
/// skipped silently; a domain whose registration fails is logged and
/// disabled without affecting its peers.
pub async fn init_domains(config: &ConfigCell, registry: &Registry) {
    let config = config.wait().await;

    for adapter in default_adapters() {
        if !config.capture_metric(adapter.gate_tag()) {
            debug!(domain = adapter.name(), "domain disabled by configuration");
            continue;
        }
        match adapter.register(registry).await {
            Ok(()) => debug!(domain = adapter.name(), "domain registered"),
            Err(error) => warn!(
                domain = adapter.name(),
                %error,
                "domain registration failed, continuing without it"
            ),
        }
    }
}
