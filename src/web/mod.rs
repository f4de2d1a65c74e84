//! HTTP Surface
//!
//! The exposition server that renders scrapes over `/metrics`, and the
//! request-instrumentation middleware for embedding applications.

mod middleware;
mod server;

pub use middleware::{
    approximate_request_size, HandlerLabelFn, HttpMetrics, Instrumented, RequestFootprint,
};
pub use server::{ExporterVariant, ExpositionServer};

/// Path the exposition server answers scrapes on, and the path the
/// middleware never instruments.
pub const METRICS_PATH: &str = "/metrics";
