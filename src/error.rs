//! Error types for the health exporter

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the health exporter
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (listener bind, procfs reads)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error surfaced by the metrics runtime
    #[error("metrics runtime error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// A requested, available collector failed to construct
    #[error("collector '{name}' failed to initialize: {source}")]
    CollectorInit {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// A collector backend is not present on this host
    #[error("collector backend unavailable: {0}")]
    CollectorUnavailable(String),

    /// The aggregating collector was registered a second time
    #[error("collector already registered with this registry")]
    AlreadyRegistered,

    /// Const-metric construction with the wrong number of label values
    #[error("expected {expected} label values for '{desc}', got {got}")]
    LabelArity {
        desc: String,
        expected: usize,
        got: usize,
    },

    /// Listen address could not be parsed
    #[error("invalid listen address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    /// Configuration file could not be parsed
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Configuration was published a second time
    #[error("configuration already published")]
    ConfigAlreadyPublished,

    /// Malformed procfs content
    #[error("failed to parse {path}: {reason}")]
    ProcParse { path: String, reason: String },
}

impl Error {
    /// Wrap a construction failure with the offending collector's name.
    pub fn collector_init(name: impl Into<String>, source: Error) -> Self {
        Error::CollectorInit {
            name: name.into(),
            source: Box::new(source),
        }
    }
}
