//! The crate-wide [`Error`] type.

use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong while registering exporters or collecting
/// from the cloud API.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status} for {url}")]
    Status {
        service: &'static str,
        status: u16,
        url: String,
    },

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("collection did not finish within {0:?}")]
    Timeout(Duration),

    #[error("pagination revisited {0}")]
    PaginationLoop(String),

    #[error("no {endpoint_type} endpoint configured for service {service}")]
    MissingEndpoint {
        service: &'static str,
        endpoint_type: String,
    },

    #[error("metric {metric} expects {expected} labels, got {got}")]
    LabelMismatch {
        metric: String,
        expected: usize,
        got: usize,
    },

    #[error("metric {0} is not declared by this exporter")]
    UnknownMetric(String),

    #[error("metric {0} is declared twice")]
    DuplicateMetric(String),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to install Prometheus exporter: {0}")]
    Exporter(#[from] metrics_exporter_prometheus::BuildError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
