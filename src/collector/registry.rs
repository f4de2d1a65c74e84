//! Collector Registry
//!
//! Name-indexed catalogue of sub-collector factories, plus the filter and
//! loader the aggregating collector drives on startup.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::collector::HostCollector;
use crate::error::{Error, Result};

/// Zero-argument sub-collector factory.
pub type CollectorFactory = fn() -> Result<Box<dyn HostCollector>>;

/// Mapping from sub-collector name to factory.
///
/// Populated at process init and effectively frozen once configuration has
/// been read; registration after the aggregator has loaded its set has no
/// effect on running scrapes.
#[derive(Default)]
pub struct CollectorRegistry {
    factories: RwLock<BTreeMap<&'static str, CollectorFactory>>,
}

impl CollectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a stable short name (e.g. `cpu`).
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register(&self, name: &'static str, factory: CollectorFactory) {
        self.factories.write().insert(name, factory);
    }

    /// Names with a registered factory, sorted.
    pub fn available_names(&self) -> Vec<String> {
        self.factories.read().keys().map(|n| n.to_string()).collect()
    }

    /// Whether a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Instantiate the collector registered under `name`.
    ///
    /// Fails with [`Error::CollectorUnavailable`] for unknown names and wraps
    /// factory failures in [`Error::CollectorInit`] naming the collector.
    pub fn instantiate(&self, name: &str) -> Result<Box<dyn HostCollector>> {
        let factory = *self
            .factories
            .read()
            .get(name)
            .ok_or_else(|| Error::CollectorUnavailable(name.to_string()))?;
        factory().map_err(|e| Error::collector_init(name, e))
    }

    /// Filter a comma-separated request list down to registered names.
    ///
    /// Input order is preserved, duplicates collapse to their first
    /// occurrence, and unknown names are silently dropped — a collector
    /// absent on one platform must not abort the whole load.
    pub fn filter_available(&self, requested: &str) -> Vec<String> {
        let factories = self.factories.read();
        let mut seen = Vec::new();
        for name in requested.split(',') {
            let name = name.trim();
            if name.is_empty() || !factories.contains_key(name) {
                continue;
            }
            if !seen.iter().any(|s: &String| s == name) {
                seen.push(name.to_string());
            }
        }
        seen
    }

    /// Filter the request list and instantiate every surviving collector.
    ///
    /// Any factory failure aborts the whole load with an error naming the
    /// first offending collector.
    pub fn load(&self, requested: &str) -> Result<BTreeMap<String, Box<dyn HostCollector>>> {
        let mut collectors = BTreeMap::new();
        for name in self.filter_available(requested) {
            let collector = self.instantiate(&name)?;
            collectors.insert(name, collector);
        }
        Ok(collectors)
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("names", &self.available_names())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
