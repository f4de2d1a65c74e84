//! Health Exporter Integration Tests
//!
//! End-to-end coverage across the public surface:
//! - Aggregating collector: fan-out, per-collector meta-observations,
//!   partial-failure isolation, unknown-name filtering
//! - Text exposition of a full scrape
//! - Request middleware: size computation, metrics-path bypass
//! - Configuration gate driving domain initialization

use std::sync::Arc;

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};

use health_exporter::collector::{AggregateCollector, CollectorRegistry, HostCollector};
use health_exporter::error::{Error, Result};
use health_exporter::metrics::{new_desc, MetricSink};

// =============================================================================
// Shared Fixtures
// =============================================================================

struct StaticGauge;

impl HostCollector for StaticGauge {
    fn update(&self, sink: &MetricSink) -> Result<()> {
        let desc = new_desc("test", "static_value", "Fixed test sample.", &[])?;
        sink.const_gauge(&desc, 42.0, &[])
    }
}

struct AlwaysFailing;

impl HostCollector for AlwaysFailing {
    fn update(&self, _sink: &MetricSink) -> Result<()> {
        Err(Error::CollectorUnavailable("device missing".to_string()))
    }
}

fn ok_factory() -> Result<Box<dyn HostCollector>> {
    Ok(Box::new(StaticGauge))
}

fn failing_factory() -> Result<Box<dyn HostCollector>> {
    Ok(Box::new(AlwaysFailing))
}

fn two_collector_registry() -> CollectorRegistry {
    let registry = CollectorRegistry::new();
    registry.register("cpu", ok_factory);
    registry.register("meminfo", ok_factory);
    registry
}

/// Value of the sample in `family_name` whose `collector` label is `name`.
fn meta_sample(families: &[MetricFamily], family_name: &str, name: &str) -> Option<f64> {
    families
        .iter()
        .find(|f| f.get_name() == family_name)?
        .get_metric()
        .iter()
        .find(|m| {
            m.get_label()
                .iter()
                .any(|pair| pair.get_name() == "collector" && pair.get_value() == name)
        })
        .map(|m| m.get_gauge().get_value())
}

// =============================================================================
// Aggregating Collector
// =============================================================================

mod aggregation_tests {
    use super::*;
    use health_exporter::collector::DEFAULT_COLLECTORS;

    #[test]
    fn test_default_load_on_minimal_host() {
        let registry = two_collector_registry();
        let aggregate =
            AggregateCollector::from_registry(&registry, DEFAULT_COLLECTORS).unwrap();

        let prom = Registry::new();
        aggregate.register(&prom).unwrap();

        let families = prom.gather();
        let samples: usize = families.iter().map(|f| f.get_metric().len()).sum();
        assert!(samples >= 4);

        for name in ["cpu", "meminfo"] {
            let success =
                meta_sample(&families, "machine_scrape_collector_success", name).unwrap();
            assert_eq!(success, 1.0);
            let duration =
                meta_sample(&families, "machine_scrape_collector_duration_seconds", name)
                    .unwrap();
            assert!(duration >= 0.0);
        }
    }

    #[test]
    fn test_partial_scrape_failure_is_isolated() {
        let registry = CollectorRegistry::new();
        registry.register("cpu", ok_factory);
        registry.register("diskstats", failing_factory);

        let aggregate = AggregateCollector::from_registry(&registry, "cpu,diskstats").unwrap();
        let prom = Registry::new();
        aggregate.register(&prom).unwrap();

        let families = prom.gather();
        assert_eq!(
            meta_sample(&families, "machine_scrape_collector_success", "cpu"),
            Some(1.0)
        );
        assert_eq!(
            meta_sample(&families, "machine_scrape_collector_success", "diskstats"),
            Some(0.0)
        );
        for name in ["cpu", "diskstats"] {
            assert!(
                meta_sample(&families, "machine_scrape_collector_duration_seconds", name)
                    .is_some()
            );
        }
    }

    #[test]
    fn test_unknown_collector_silently_dropped() {
        let registry = two_collector_registry();
        let aggregate =
            AggregateCollector::from_registry(&registry, "cpu,made_up,meminfo").unwrap();
        assert_eq!(aggregate.collector_names(), vec!["cpu", "meminfo"]);
    }

    #[test]
    fn test_repeated_scrapes_keep_failing_collector_at_zero() {
        let registry = CollectorRegistry::new();
        registry.register("cpu", ok_factory);
        registry.register("diskstats", failing_factory);

        let aggregate = AggregateCollector::from_registry(&registry, "cpu,diskstats").unwrap();
        let prom = Registry::new();
        aggregate.register(&prom).unwrap();

        for _ in 0..3 {
            let families = prom.gather();
            assert_eq!(
                meta_sample(&families, "machine_scrape_collector_success", "diskstats"),
                Some(0.0)
            );
            assert_eq!(
                meta_sample(&families, "machine_scrape_collector_success", "cpu"),
                Some(1.0)
            );
        }
    }
}

// =============================================================================
// Text Exposition
// =============================================================================

mod exposition_tests {
    use super::*;

    #[test]
    fn test_scrape_renders_in_text_format() {
        let registry = two_collector_registry();
        let aggregate = AggregateCollector::from_registry(&registry, "cpu,meminfo").unwrap();
        let prom = Registry::new();
        aggregate.register(&prom).unwrap();

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prom.gather(), &mut buffer).unwrap();
        let body = String::from_utf8(buffer).unwrap();

        assert!(body.contains("machine_scrape_collector_success{collector=\"cpu\"} 1"));
        assert!(body.contains("machine_scrape_collector_success{collector=\"meminfo\"} 1"));
        assert!(body.contains("machine_test_static_value 42"));
        // Each family name appears exactly once in the exposition.
        let type_lines = body
            .lines()
            .filter(|l| l.starts_with("# TYPE machine_scrape_collector_success"))
            .count();
        assert_eq!(type_lines, 1);
    }
}

// =============================================================================
// Request Middleware
// =============================================================================

mod middleware_tests {
    use super::*;
    use std::convert::Infallible;

    use bytes::Bytes;
    use http_body_util::Full;
    use hyper::header;
    use hyper::service::{service_fn, Service};
    use hyper::{Method, Request, Response, Version};

    use health_exporter::web::{approximate_request_size, HttpMetrics};

    #[test]
    fn test_request_size_closed_form() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/p?q=1")
            .version(Version::HTTP_11)
            .header("X", "ab")
            .header(header::HOST, "h")
            .body(())
            .unwrap();

        assert_eq!(approximate_request_size(&req), 21);
    }

    #[tokio::test]
    async fn test_metrics_path_is_never_instrumented() {
        let metrics = Arc::new(HttpMetrics::new("app").unwrap());
        let prom = Registry::new();
        metrics.register(&prom).unwrap();

        let service = metrics.instrument(service_fn(|_req: Request<Full<Bytes>>| async {
            Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(b"snapshot"))))
        }));

        let request = Request::builder()
            .method(Method::GET)
            .uri("/metrics")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = service.call(request).await.unwrap();
        assert_eq!(response.status(), 200);

        let counted: usize = prom
            .gather()
            .iter()
            .filter(|f| f.get_name() == "app_requests_total")
            .map(|f| f.get_metric().len())
            .sum();
        assert_eq!(counted, 0);
    }

    #[tokio::test]
    async fn test_instrumented_request_appears_in_gather() {
        let metrics = Arc::new(HttpMetrics::new("app2").unwrap());
        let prom = Registry::new();
        metrics.register(&prom).unwrap();

        let service = metrics.instrument(service_fn(|_req: Request<Full<Bytes>>| async {
            Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(b"ok"))))
        }));

        let request = Request::builder()
            .method(Method::GET)
            .uri("/work")
            .body(Full::new(Bytes::new()))
            .unwrap();
        service.call(request).await.unwrap();

        let families = prom.gather();
        let requests = families
            .iter()
            .find(|f| f.get_name() == "app2_requests_total")
            .unwrap();
        let metric = &requests.get_metric()[0];
        assert_eq!(metric.get_counter().get_value(), 1.0);

        let labels: Vec<(&str, &str)> = metric
            .get_label()
            .iter()
            .map(|p| (p.get_name(), p.get_value()))
            .collect();
        assert!(labels.contains(&("code", "200")));
        assert!(labels.contains(&("method", "GET")));
        assert!(labels.contains(&("handler", "/work")));
    }
}

// =============================================================================
// Configuration Gate
// =============================================================================

mod gate_tests {
    use super::*;
    use health_exporter::config::{ConfigCell, HealthConfig};
    use health_exporter::init_domains;

    #[tokio::test]
    async fn test_empty_gate_disables_every_domain() {
        let cell = ConfigCell::new();
        cell.publish(HealthConfig {
            endpoints: vec!["127.0.0.1:9100".to_string()],
            metrics: vec![],
        })
        .unwrap();

        let prom = Registry::new();
        init_domains(&cell, &prom).await;
        assert!(prom.gather().is_empty());
    }

    #[tokio::test]
    async fn test_gpu_gate_on_without_driver_leaves_machine_serving() {
        let cell = ConfigCell::new();
        cell.publish(HealthConfig {
            endpoints: vec![],
            metrics: vec!["gpu".to_string(), "MACHINE".to_string()],
        })
        .unwrap();

        let prom = Registry::new();
        init_domains(&cell, &prom).await;

        // The gpu domain may or may not construct depending on the host;
        // either way the machine domain must serve.
        let families = prom.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "machine_scrape_collector_success"));
    }
}
