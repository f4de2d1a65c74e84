//! Aggregating Collector
//!
//! Implements the gatherer-side collector contract. Every scrape fans out to
//! one task per loaded sub-collector, records per-collector duration and
//! success observations, and multiplexes all emissions into a single
//! snapshot returned to the gatherer.

use std::collections::BTreeMap;
use std::time::Instant;

use prometheus::core::{Collector, Desc};
use prometheus::proto;
use tracing::{debug, error};

use crate::collector::{CollectorRegistry, HostCollector, DEFAULT_COLLECTORS, DEFAULT_REGISTRY};
use crate::error::{Error, Result};
use crate::metrics::{merge_families, new_desc, MetricSink};

/// Fan-out collector over the loaded sub-collector set.
///
/// Registered once with a `prometheus::Registry`; repeated registration fails
/// on the second call. There is no per-collector timeout, so a stalled
/// sub-collector stalls the scrape it is part of.
pub struct AggregateCollector {
    collectors: BTreeMap<String, Box<dyn HostCollector>>,
    duration_desc: Desc,
    success_desc: Desc,
}

impl AggregateCollector {
    /// Build an aggregator over an already-instantiated collector set.
    pub fn new(collectors: BTreeMap<String, Box<dyn HostCollector>>) -> Result<Self> {
        Ok(Self {
            collectors,
            duration_desc: new_desc(
                "scrape",
                "collector_duration_seconds",
                "machine_exporter: Duration of a collector scrape.",
                &["collector"],
            )?,
            success_desc: new_desc(
                "scrape",
                "collector_success",
                "machine_exporter: Whether a collector succeeded.",
                &["collector"],
            )?,
        })
    }

    /// Filter `requested` against `registry`, instantiate the survivors, and
    /// build the aggregator over them.
    pub fn from_registry(registry: &CollectorRegistry, requested: &str) -> Result<Self> {
        Self::new(registry.load(requested)?)
    }

    /// Names of the loaded sub-collectors, sorted.
    pub fn collector_names(&self) -> Vec<&str> {
        self.collectors.keys().map(String::as_str).collect()
    }

    /// Register this aggregator with a prometheus registry.
    ///
    /// Fails with [`Error::AlreadyRegistered`] if an aggregator carrying the
    /// same descriptors is already registered there.
    pub fn register(self, registry: &prometheus::Registry) -> Result<()> {
        match registry.register(Box::new(self)) {
            Ok(()) => Ok(()),
            Err(prometheus::Error::AlreadyReg) => Err(Error::AlreadyRegistered),
            Err(e) => Err(e.into()),
        }
    }

    /// Run one sub-collector and emit its meta-observations.
    ///
    /// A failed update is logged and reported as `scrape_collector_success 0`;
    /// it never propagates, so one sub-collector's failure cannot hide the
    /// outputs of its peers.
    fn execute(&self, name: &str, collector: &dyn HostCollector, sink: &MetricSink) {
        let begin = Instant::now();
        let outcome = collector.update(sink);
        let elapsed = begin.elapsed().as_secs_f64();

        let success = match outcome {
            Ok(()) => {
                debug!(collector = name, elapsed_seconds = elapsed, "collector succeeded");
                1.0
            }
            Err(e) => {
                error!(
                    collector = name,
                    elapsed_seconds = elapsed,
                    error = %e,
                    "collector failed"
                );
                0.0
            }
        };

        // Both descriptors carry exactly one variable label; arity errors
        // cannot occur here, but a sink refusal is still worth a log line.
        if let Err(e) = sink.const_gauge(&self.duration_desc, elapsed, &[name]) {
            error!(collector = name, error = %e, "failed to emit scrape duration");
        }
        if let Err(e) = sink.const_gauge(&self.success_desc, success, &[name]) {
            error!(collector = name, error = %e, "failed to emit scrape success");
        }
    }
}

impl Collector for AggregateCollector {
    /// Emits exactly the two fixed descriptors. Sub-collector descriptors are
    /// deliberately not forwarded, permitting sub-collectors to emit
    /// unregistered metrics dynamically.
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.duration_desc, &self.success_desc]
    }

    /// One concurrent scrape: fan out, join, drain, merge.
    ///
    /// All sub-collector emissions and the aggregator's own meta-observations
    /// are observed by the consumer before this returns.
    fn collect(&self) -> Vec<proto::MetricFamily> {
        let (sink, rx) = MetricSink::channel();

        std::thread::scope(|scope| {
            for (name, collector) in &self.collectors {
                let task_sink = sink.clone();
                scope.spawn(move || self.execute(name, collector.as_ref(), &task_sink));
            }
        });

        // Every producer clone is gone once the scope joins; dropping ours
        // terminates the drain below.
        drop(sink);
        merge_families(rx.into_iter())
    }
}

impl std::fmt::Debug for AggregateCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateCollector")
            .field("collectors", &self.collector_names())
            .finish()
    }
}

/// Load the default collector set from the process-global registry and
/// register the aggregator with `registry`.
pub fn register_default_collectors(registry: &prometheus::Registry) -> Result<()> {
    AggregateCollector::from_registry(&DEFAULT_REGISTRY, DEFAULT_COLLECTORS)?.register(registry)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    struct OkCollector;

    impl HostCollector for OkCollector {
        fn update(&self, sink: &MetricSink) -> Result<()> {
            let desc = new_desc("test", "ok_metric", "test metric", &[])?;
            sink.const_gauge(&desc, 7.0, &[])?;
            Ok(())
        }
    }

    struct FailingCollector;

    impl HostCollector for FailingCollector {
        fn update(&self, _sink: &MetricSink) -> Result<()> {
            Err(Error::CollectorUnavailable("simulated failure".to_string()))
        }
    }

    fn test_registry() -> CollectorRegistry {
        let registry = CollectorRegistry::new();
        registry.register("cpu", || Ok(Box::new(OkCollector)));
        registry.register("meminfo", || Ok(Box::new(OkCollector)));
        registry.register("diskstats", || Ok(Box::new(FailingCollector)));
        registry
    }

    fn sample_value(families: &[proto::MetricFamily], name: &str, collector: &str) -> Option<f64> {
        families
            .iter()
            .find(|f| f.get_name() == name)?
            .get_metric()
            .iter()
            .find(|m| {
                m.get_label()
                    .iter()
                    .any(|l| l.get_name() == "collector" && l.get_value() == collector)
            })
            .map(|m| m.get_gauge().get_value())
    }

    fn sample_count(families: &[proto::MetricFamily], name: &str, collector: &str) -> usize {
        families
            .iter()
            .filter(|f| f.get_name() == name)
            .flat_map(|f| f.get_metric())
            .filter(|m| {
                m.get_label()
                    .iter()
                    .any(|l| l.get_name() == "collector" && l.get_value() == collector)
            })
            .count()
    }

    #[test]
    fn test_collect_emits_duration_and_success_per_collector() {
        let aggregate =
            AggregateCollector::from_registry(&test_registry(), "cpu,meminfo").unwrap();
        let families = aggregate.collect();

        for name in ["cpu", "meminfo"] {
            assert_eq!(
                sample_count(&families, "machine_scrape_collector_duration_seconds", name),
                1
            );
            assert_eq!(
                sample_count(&families, "machine_scrape_collector_success", name),
                1
            );
            let duration =
                sample_value(&families, "machine_scrape_collector_duration_seconds", name)
                    .unwrap();
            assert!(duration >= 0.0);
            assert_eq!(
                sample_value(&families, "machine_scrape_collector_success", name),
                Some(1.0)
            );
        }
    }

    #[test]
    fn test_partial_failure_does_not_affect_peers() {
        let aggregate =
            AggregateCollector::from_registry(&test_registry(), "cpu,diskstats").unwrap();

        // Deterministic across repeated scrapes.
        for _ in 0..3 {
            let families = aggregate.collect();
            assert_eq!(
                sample_value(&families, "machine_scrape_collector_success", "cpu"),
                Some(1.0)
            );
            assert_eq!(
                sample_value(&families, "machine_scrape_collector_success", "diskstats"),
                Some(0.0)
            );
            assert!(sample_value(
                &families,
                "machine_scrape_collector_duration_seconds",
                "diskstats"
            )
            .is_some());
        }
    }

    #[test]
    fn test_unknown_collector_dropped_from_load() {
        let aggregate =
            AggregateCollector::from_registry(&test_registry(), "cpu,made_up,meminfo").unwrap();
        assert_eq!(aggregate.collector_names(), vec!["cpu", "meminfo"]);
    }

    #[test]
    fn test_sub_collector_emissions_reach_snapshot() {
        let aggregate = AggregateCollector::from_registry(&test_registry(), "cpu").unwrap();
        let families = aggregate.collect();

        let family = families
            .iter()
            .find(|f| f.get_name() == "machine_test_ok_metric")
            .expect("sub-collector family missing");
        assert_eq!(family.get_metric()[0].get_gauge().get_value(), 7.0);
    }

    #[test]
    fn test_same_family_from_two_collectors_is_merged() {
        let aggregate =
            AggregateCollector::from_registry(&test_registry(), "cpu,meminfo").unwrap();
        let families = aggregate.collect();

        let matching: Vec<_> = families
            .iter()
            .filter(|f| f.get_name() == "machine_test_ok_metric")
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].get_metric().len(), 2);
    }

    #[test]
    fn test_describe_emits_only_fixed_descriptors() {
        let aggregate =
            AggregateCollector::from_registry(&test_registry(), "cpu,meminfo").unwrap();
        let descs = aggregate.desc();
        assert_eq!(descs.len(), 2);
        assert_eq!(descs[0].fq_name, "machine_scrape_collector_duration_seconds");
        assert_eq!(descs[1].fq_name, "machine_scrape_collector_success");
    }

    #[test]
    fn test_repeated_registration_fails() {
        let prom = prometheus::Registry::new();
        let registry = test_registry();

        AggregateCollector::from_registry(&registry, "cpu")
            .unwrap()
            .register(&prom)
            .unwrap();

        let second = AggregateCollector::from_registry(&registry, "cpu")
            .unwrap()
            .register(&prom);
        assert_matches!(second, Err(Error::AlreadyRegistered));
    }

    #[test]
    fn test_gather_through_prometheus_registry() {
        let prom = prometheus::Registry::new();
        AggregateCollector::from_registry(&test_registry(), "cpu,meminfo")
            .unwrap()
            .register(&prom)
            .unwrap();

        let families = prom.gather();
        // 2 collectors x {duration, success} plus the merged test family.
        assert_eq!(
            sample_count(&families, "machine_scrape_collector_success", "cpu")
                + sample_count(&families, "machine_scrape_collector_success", "meminfo"),
            2
        );
    }
}
