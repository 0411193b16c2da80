//! Validated metric-name prefix.

use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

/// Prefix prepended to every exported metric name.
///
/// Must be non-empty ASCII alphanumeric (`^[A-Za-z0-9]+$`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricPrefix(String);

impl MetricPrefix {
    pub const DEFAULT: &'static str = "era5";

    pub fn new(prefix: &str) -> Result<Self, ClientError> {
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ClientError::InvalidMetricPrefix(prefix.to_string()));
        }
        Ok(Self(prefix.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MetricPrefix {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl FromStr for MetricPrefix {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for MetricPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
