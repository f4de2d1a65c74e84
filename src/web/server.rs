//! Exposition Server
//!
//! Serves the text-format snapshot at `/metrics` and a landing page at `/`.
//! Encoding follows a continue-on-error policy: a family that fails to
//! encode is logged and skipped, and the scrape still returns whatever
//! could be produced.

use std::convert::Infallible;
use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::web::METRICS_PATH;

/// Which exporter a server instance fronts; shown on the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterVariant {
    Machine,
    Web,
}

impl ExporterVariant {
    fn title(self) -> &'static str {
        match self {
            ExporterVariant::Machine => "Machine Exporter",
            ExporterVariant::Web => "Web Exporter",
        }
    }
}

/// HTTP exposition server over a prometheus registry.
pub struct ExpositionServer {
    registry: Registry,
    landing_page: Bytes,
}

impl ExpositionServer {
    pub fn new(registry: Registry, variant: ExporterVariant) -> Self {
        let landing_page = Bytes::from(format!(
            "<html>\n\
             <head><title>{title}</title></head>\n\
             <body>\n\
             <h1>{title}</h1>\n\
             <p><a href='{METRICS_PATH}'>Metrics</a></p>\n\
             </body>\n\
             </html>\n",
            title = variant.title(),
        ));
        Self {
            registry,
            landing_page,
        }
    }

    /// Machine-exporter variant over `registry`.
    pub fn machine(registry: Registry) -> Self {
        Self::new(registry, ExporterVariant::Machine)
    }

    /// Web-exporter variant over `registry`.
    pub fn web(registry: Registry) -> Self {
        Self::new(registry, ExporterVariant::Web)
    }

    /// Bind `addr` and serve until the listener fails.
    ///
    /// Bind errors are returned to the caller; cancellation is by process
    /// exit, there is no graceful-shutdown channel.
    pub async fn serve(&self, addr: &str) -> Result<()> {
        let addr: SocketAddr = addr.parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "exposition server listening");

        loop {
            let (stream, _) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let registry = self.registry.clone();
            let landing_page = self.landing_page.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let registry = registry.clone();
                    let landing_page = landing_page.clone();
                    async move { Ok::<_, Infallible>(route(&req, &registry, landing_page)) }
                });
                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!(error = %e, "exposition connection error");
                }
            });
        }
    }
}

fn route<B>(req: &Request<B>, registry: &Registry, landing_page: Bytes) -> Response<Full<Bytes>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, METRICS_PATH) => render_snapshot(registry),
        (&Method::GET, "/") => response(StatusCode::OK, "text/html", landing_page),
        _ => response(StatusCode::NOT_FOUND, "text/plain", Bytes::from_static(b"not found")),
    }
}

/// Encode the gathered snapshot, skipping families that fail to encode.
fn render_snapshot(registry: &Registry) -> Response<Full<Bytes>> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    let mut failures = 0usize;

    for family in registry.gather() {
        if let Err(e) = encoder.encode(&[family], &mut buffer) {
            failures += 1;
            warn!(error = %e, "skipping family that failed to encode");
        }
    }

    if buffer.is_empty() && failures > 0 {
        return response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain",
            Bytes::from_static(b"no metric family could be encoded"),
        );
    }

    response(StatusCode::OK, encoder.format_type(), Bytes::from(buffer))
}

fn response(status: StatusCode, content_type: &str, body: Bytes) -> Response<Full<Bytes>> {
    match Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .body(Full::new(body))
    {
        Ok(resp) => resp,
        Err(e) => {
            // Static parts only; can fail only on a malformed content type.
            error!(error = %e, "failed to build response");
            Response::new(Full::new(Bytes::new()))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
