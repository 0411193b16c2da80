//! Error types for the VictoriaMetrics client.

use thiserror::Error;

/// Errors raised while constructing a client.
///
/// Inserts never fail with an error; see [`InsertOutcome`](crate::InsertOutcome).
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid insert URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Inserting into {path:?} is not supported (supported paths: {supported})")]
    UnsupportedEndpoint { path: String, supported: String },

    #[error("Metric prefix {0:?} does not match ^[A-Za-z0-9]+$")]
    InvalidMetricPrefix(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for client construction.
pub type Result<T> = std::result::Result<T, ClientError>;
