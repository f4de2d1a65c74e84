//! Machine Domain Adapter
//!
//! Registers the aggregating host collector, loaded with the default
//! sub-collector set, when the `machine` domain is enabled.

use async_trait::async_trait;
use prometheus::Registry;

use crate::adapters::DomainAdapter;
use crate::collector::register_default_collectors;
use crate::error::Result;

/// Host metrics domain.
#[derive(Debug, Default)]
pub struct MachineAdapter;

#[async_trait]
impl DomainAdapter for MachineAdapter {
    fn name(&self) -> &'static str {
        "machine"
    }

    fn gate_tag(&self) -> &'static str {
        "machine"
    }

    async fn register(&self, registry: &Registry) -> Result<()> {
        register_default_collectors(registry)
    }
}
