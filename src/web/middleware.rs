//! Request Instrumentation
//!
//! Wraps an application handler pipeline and records, per request: count
//! (labeled by status code, method, and handler), latency, approximate
//! request size, and response size. Requests to the metrics path bypass all
//! observations so the exporter never observes its own scrapes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::Body;
use hyper::header;
use hyper::service::Service;
use hyper::{HeaderMap, Method, Request, Response, Uri, Version};
use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::web::METRICS_PATH;

/// Seam for the `handler` label; receives the request method and URI.
pub type HandlerLabelFn = Arc<dyn Fn(&Method, &Uri) -> String + Send + Sync>;

/// The four application metric families plus the wrapping machinery.
///
/// The default `handler` label is the raw request URI, matching the upstream
/// behavior. For high-cardinality path spaces this explodes the label space;
/// substitute a route-pattern labeler through [`HttpMetrics::with_handler_label`]
/// in that case.
#[derive(Clone)]
pub struct HttpMetrics {
    requests: IntCounterVec,
    duration: Histogram,
    request_size: Histogram,
    response_size: Histogram,
    metrics_path: String,
    handler_label: HandlerLabelFn,
}

impl HttpMetrics {
    /// Build the metric families under a caller-supplied subsystem name.
    pub fn new(subsystem: &str) -> Result<Self> {
        Ok(Self {
            requests: IntCounterVec::new(
                Opts::new(
                    "requests_total",
                    "How many HTTP requests processed, partitioned by status code and HTTP method.",
                )
                .subsystem(subsystem),
                &["code", "method", "handler"],
            )?,
            duration: Histogram::with_opts(
                HistogramOpts::new(
                    "request_duration_seconds",
                    "The HTTP request latencies in seconds.",
                )
                .subsystem(subsystem),
            )?,
            request_size: Histogram::with_opts(
                HistogramOpts::new("request_size_bytes", "The HTTP request sizes in bytes.")
                    .subsystem(subsystem),
            )?,
            response_size: Histogram::with_opts(
                HistogramOpts::new("response_size_bytes", "The HTTP response sizes in bytes.")
                    .subsystem(subsystem),
            )?,
            metrics_path: METRICS_PATH.to_string(),
            handler_label: Arc::new(|_method, uri| uri.to_string()),
        })
    }

    /// Override the path that bypasses instrumentation.
    pub fn with_metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = path.into();
        self
    }

    /// Replace the `handler` labeling function.
    pub fn with_handler_label(mut self, label: HandlerLabelFn) -> Self {
        self.handler_label = label;
        self
    }

    /// Register the four families with a prometheus registry.
    ///
    /// Fails with [`Error::AlreadyRegistered`] on a repeated registration.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        let register = |c: Box<dyn prometheus::core::Collector>| match registry.register(c) {
            Ok(()) => Ok(()),
            Err(prometheus::Error::AlreadyReg) => Err(Error::AlreadyRegistered),
            Err(e) => Err(Error::Prometheus(e)),
        };
        register(Box::new(self.requests.clone()))?;
        register(Box::new(self.duration.clone()))?;
        register(Box::new(self.request_size.clone()))?;
        register(Box::new(self.response_size.clone()))?;
        Ok(())
    }

    /// Wrap an inner handler pipeline.
    pub fn instrument<S>(self: &Arc<Self>, inner: S) -> Instrumented<S> {
        Instrumented {
            inner,
            metrics: Arc::clone(self),
        }
    }
}

impl std::fmt::Debug for HttpMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetrics")
            .field("metrics_path", &self.metrics_path)
            .finish()
    }
}

// =============================================================================
// Service Wrapper
// =============================================================================

/// A hyper service that records request observations around an inner service.
#[derive(Debug, Clone)]
pub struct Instrumented<S> {
    inner: S,
    metrics: Arc<HttpMetrics>,
}

impl<S, B, ResBody> Service<Request<B>> for Instrumented<S>
where
    S: Service<Request<B>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    ResBody: Body + Send,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        // The metrics path is never instrumented.
        if req.uri().path() == self.metrics.metrics_path {
            return Box::pin(self.inner.call(req));
        }

        let metrics = Arc::clone(&self.metrics);
        let start = Instant::now();
        let method = req.method().as_str().to_string();
        let handler = (metrics.handler_label)(req.method(), req.uri());

        // The size computation is pure over request metadata, so it can run
        // concurrently with the handler; the single-value conduit delivers
        // the result to the post-handler observation step.
        let footprint = RequestFootprint::of(&req);
        let (size_tx, size_rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = size_tx.send(footprint.approximate_size());
        });

        let inner = self.inner.call(req);
        Box::pin(async move {
            let response = inner.await?;

            let code = response.status().as_u16().to_string();
            let elapsed = start.elapsed().as_secs_f64();
            let response_bytes = response.body().size_hint().exact().unwrap_or(0);

            metrics.duration.observe(elapsed);
            metrics
                .requests
                .with_label_values(&[&code, &method, &handler])
                .inc();
            if let Ok(size) = size_rx.await {
                metrics.request_size.observe(size as f64);
            }
            metrics.response_size.observe(response_bytes as f64);

            Ok(response)
        })
    }
}

// =============================================================================
// Request Size
// =============================================================================

/// Snapshot of the request metadata the size computation reads.
#[derive(Debug, Clone)]
pub struct RequestFootprint {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
}

impl RequestFootprint {
    /// Capture the metadata of a request without consuming it.
    pub fn of<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            version: req.version(),
            headers: req.headers().clone(),
        }
    }

    /// Approximate request size in bytes.
    ///
    /// Sum of: origin-form URI, method token, protocol token, every header
    /// name plus its values (Host excluded), the Host field, and the
    /// Content-Length value when non-negative. Form and multipart bodies are
    /// assumed already reflected in the URI or Content-Length.
    pub fn approximate_size(&self) -> usize {
        let mut size = self
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().len())
            .unwrap_or(0);
        size += self.method.as_str().len();
        size += proto_token(self.version).len();

        for name in self.headers.keys() {
            // The Host field is accounted for separately below.
            if *name == header::HOST {
                continue;
            }
            size += name.as_str().len();
            for value in self.headers.get_all(name) {
                size += value.len();
            }
        }

        size += self
            .headers
            .get(header::HOST)
            .map(|v| v.len())
            .or_else(|| self.uri.host().map(str::len))
            .unwrap_or(0);

        if let Some(length) = self
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
        {
            if length > 0 {
                size += length as usize;
            }
        }

        size
    }
}

/// Approximate request size; see [`RequestFootprint::approximate_size`].
pub fn approximate_request_size<B>(req: &Request<B>) -> usize {
    RequestFootprint::of(req).approximate_size()
}

fn proto_token(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "HTTP/0.9"
    } else if version == Version::HTTP_10 {
        "HTTP/1.0"
    } else if version == Version::HTTP_2 {
        "HTTP/2.0"
    } else if version == Version::HTTP_3 {
        "HTTP/3.0"
    } else {
        "HTTP/1.1"
    }
}

// =============================================================================
// Tests
// =============================================================================
