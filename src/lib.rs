//! Health Exporter - Host and Application Telemetry
//!
//! Exposes machine-level and application-level metrics in the Prometheus
//! text exposition format. Host metrics are gathered by an aggregating
//! collector that fans one scrape out across a set of procfs sub-collectors;
//! application metrics come from a middleware that instruments an embedding
//! program's HTTP handler pipeline.
//!
//! # Architecture
//!
//! ```text
//! GET /metrics → registry gather → aggregating collector
//!                                        │ fan-out (one task per sub-collector)
//!                                        ▼
//!                    cpu │ meminfo │ loadavg │ netdev │ ...
//!                                        │ duration + success per collector
//!                                        ▼
//!                            merged families → text encoder
//! ```
//!
//! Domains (machine, gpu, web) are enabled through the configured metrics
//! list and wired in by [`adapters::init_domains`] after the configuration
//! barrier fires.
//!
//! # Modules
//!
//! - [`adapters`] - Per-domain registration shims behind the feature gate
//! - [`collector`] - Host sub-collectors, their registry, and the aggregator
//! - [`config`] - Read-once configuration with a one-shot barrier
//! - [`error`] - Error types
//! - [`metrics`] - Descriptor and constant-sample primitives
//! - [`web`] - Exposition server and request-instrumentation middleware

pub mod adapters;
pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod web;

// Re-export commonly used types
pub use adapters::{http_metrics, init_domains};
pub use collector::{AggregateCollector, CollectorRegistry, HostCollector, DEFAULT_COLLECTORS};
pub use config::{ConfigCell, HealthConfig, CONFIG};
pub use error::{Error, Result};
pub use web::{ExpositionServer, HttpMetrics, METRICS_PATH};
