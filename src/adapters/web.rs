//! Web Domain Adapter
//!
//! Owns the process-wide [`HttpMetrics`] instance. Registration builds the
//! four application metric families and publishes a shared handle so the
//! embedding program can wrap its handler pipeline with
//! [`HttpMetrics::instrument`].

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use prometheus::Registry;

use crate::adapters::DomainAdapter;
use crate::error::Result;
use crate::web::HttpMetrics;

static HTTP_METRICS: OnceCell<Arc<HttpMetrics>> = OnceCell::new();

/// Shared request-instrumentation handle; `None` until the web domain has
/// been initialized.
pub fn http_metrics() -> Option<Arc<HttpMetrics>> {
    HTTP_METRICS.get().cloned()
}

/// Application (HTTP request) metrics domain.
#[derive(Debug, Default)]
pub struct WebAdapter;

#[async_trait]
impl DomainAdapter for WebAdapter {
    fn name(&self) -> &'static str {
        "web"
    }

    fn gate_tag(&self) -> &'static str {
        "web"
    }

    async fn register(&self, registry: &Registry) -> Result<()> {
        let metrics =
            HTTP_METRICS.get_or_try_init(|| HttpMetrics::new("web").map(Arc::new))?;
        metrics.register(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_publishes_shared_handle() {
        let registry = Registry::new();
        WebAdapter.register(&registry).await.unwrap();

        assert!(http_metrics().is_some());
        // The histogram families always carry one (possibly empty) sample
        // set; the counter vec stays invisible until its first increment.
        let names: Vec<String> = registry
            .gather()
            .into_iter()
            .map(|mut f| f.take_name())
            .collect();
        assert!(names.contains(&"web_request_duration_seconds".to_string()));
        assert!(names.contains(&"web_request_size_bytes".to_string()));
        assert!(names.contains(&"web_response_size_bytes".to_string()));
    }
}
