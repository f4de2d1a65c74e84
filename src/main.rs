//! Health Exporter
//!
//! Standalone exporter binary: reads the health configuration, initializes
//! the enabled metric domains, and serves the text exposition format on each
//! configured endpoint.

use clap::Parser;
use futures::future::try_join_all;
use prometheus::Registry;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use health_exporter::config::CONFIG;
use health_exporter::error::Result;
use health_exporter::web::ExpositionServer;
use health_exporter::{init_domains, HealthConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Health Exporter - host and application metrics in Prometheus text format
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(long, env = "HEALTH_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Listen addresses, comma-separated (overrides the config file)
    #[arg(long, env = "HEALTH_ENDPOINTS")]
    endpoints: Option<String>,

    /// Enabled metric domains, comma-separated (overrides the config file)
    #[arg(long, env = "HEALTH_METRICS")]
    metrics: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// Resolve the effective configuration: file first, CLI overrides on
    /// top, built-in defaults last.
    fn resolve_config(&self) -> Result<HealthConfig> {
        let mut config = match &self.config {
            Some(path) => HealthConfig::from_yaml_file(path)?,
            None => HealthConfig::default(),
        };

        if let Some(endpoints) = &self.endpoints {
            config.endpoints = split_list(endpoints);
        }
        if let Some(metrics) = &self.metrics {
            config.metrics = split_list(metrics);
        }

        if config.endpoints.is_empty() {
            config.endpoints = vec!["0.0.0.0:9100".to_string()];
        }
        if config.metrics.is_empty() {
            config.metrics = vec!["machine".to_string()];
        }
        Ok(config)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = args.resolve_config().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Starting Health Exporter");
    info!("  Endpoints: {}", config.endpoints.join(", "));
    info!("  Domains: {}", config.metrics.join(", "));

    let endpoints = config.endpoints.clone();
    CONFIG.publish(config)?;

    let registry = Registry::new();
    init_domains(&CONFIG, &registry).await;

    let servers: Vec<_> = endpoints
        .into_iter()
        .map(|endpoint| {
            let server = ExpositionServer::machine(registry.clone());
            tokio::spawn(async move {
                info!("Serving metrics on http://{}/metrics", endpoint);
                server.serve(&endpoint).await.map_err(|e| {
                    error!("Exposition server on {} failed: {}", endpoint, e);
                    e
                })
            })
        })
        .collect();

    for result in try_join_all(servers).await.expect("server task panicked") {
        result?;
    }
    Ok(())
}

// =============================================================================
// Logging
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
