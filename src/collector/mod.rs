//! Host Collectors
//!
//! The collector orchestration layer: a name-indexed registry of sub-collector
//! factories, the builtin procfs sub-collectors, and the aggregating collector
//! that fans a scrape out to every loaded sub-collector in parallel.
//!
//! # Architecture
//!
//! ```text
//! GET /metrics ──▶ prometheus::Registry::gather
//!                          │
//!                          ▼
//!                 AggregateCollector::collect
//!                   ├── cpu ───────┐
//!                   ├── meminfo ───┤  one task per sub-collector,
//!                   ├── loadavg ───┤  samples through a shared MetricSink
//!                   └── ...  ──────┘
//! ```

mod aggregate;
mod registry;

mod cpu;
mod entropy;
mod filefd;
mod loadavg;
mod meminfo;
mod netdev;
mod time;
mod uname;

pub use aggregate::{register_default_collectors, AggregateCollector};
pub use registry::{CollectorFactory, CollectorRegistry};

pub use cpu::CpuCollector;
pub use entropy::EntropyCollector;
pub use filefd::FileFdCollector;
pub use loadavg::LoadavgCollector;
pub use meminfo::MeminfoCollector;
pub use netdev::NetdevCollector;
pub use time::TimeCollector;
pub use uname::UnameCollector;

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::metrics::MetricSink;

/// Default sub-collector request list.
///
/// Entries without a factory on this platform are silently dropped by
/// [`CollectorRegistry::filter_available`].
pub const DEFAULT_COLLECTORS: &str = "arp,bcache,conntrack,cpu,diskstats,entropy,edac,exec,\
filefd,filesystem,hwmon,infiniband,loadavg,mdadm,meminfo,netdev,netstat,\
sockstat,stat,textfile,time,uname,vmstat,wifi,xfs,zfs";

/// A named unit that contributes zero or more samples to a scrape.
///
/// Implementations are invoked once per scrape from a task owned by the
/// aggregator and must be safe to call from consecutive scrapes; any caching
/// across scrapes is the collector's own concern.
pub trait HostCollector: Send + Sync {
    /// Emit this collector's samples into the scrape sink.
    fn update(&self, sink: &MetricSink) -> Result<()>;
}

impl std::fmt::Debug for dyn HostCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostCollector")
    }
}

/// Process-global registry holding the builtin sub-collector factories.
///
/// Populated before configuration read; additional factories may be
/// registered by the embedding program during process init.
pub static DEFAULT_REGISTRY: Lazy<CollectorRegistry> = Lazy::new(builtin_registry);

fn builtin_registry() -> CollectorRegistry {
    let registry = CollectorRegistry::new();
    registry.register("cpu", || Ok(Box::new(CpuCollector::new()?)));
    registry.register("entropy", || Ok(Box::new(EntropyCollector::new()?)));
    registry.register("filefd", || Ok(Box::new(FileFdCollector::new()?)));
    registry.register("loadavg", || Ok(Box::new(LoadavgCollector::new()?)));
    registry.register("meminfo", || Ok(Box::new(MeminfoCollector::new()?)));
    registry.register("netdev", || Ok(Box::new(NetdevCollector::new()?)));
    registry.register("time", || Ok(Box::new(TimeCollector::new()?)));
    registry.register("uname", || Ok(Box::new(UnameCollector::new()?)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_names() {
        let names = DEFAULT_REGISTRY.available_names();
        assert!(names.contains(&"cpu".to_string()));
        assert!(names.contains(&"meminfo".to_string()));
        assert!(!names.contains(&"zfs".to_string()));
    }

    #[test]
    fn test_default_list_filters_to_builtins() {
        let filtered = DEFAULT_REGISTRY.filter_available(DEFAULT_COLLECTORS);
        assert_eq!(
            filtered,
            vec!["cpu", "entropy", "filefd", "loadavg", "meminfo", "netdev", "time", "uname"]
        );
    }
}
